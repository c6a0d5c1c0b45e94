use std::io::Write;
use std::path::{Path, PathBuf};

use kdl::{KdlDocument, KdlEntry, KdlNode};
use miette::IntoDiagnostic;
use scry_engine::{Debugger, Detection, Language};

/// Runs the subcommand for reporting what debugging a file would involve.
pub fn evaluate_detect(
    file: PathBuf,
    language: Option<Language>,
    mut output: impl Write,
) -> miette::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .into_diagnostic()?;

    let detection = runtime.block_on(async {
        let debugger = Debugger::new();
        debugger.detect(&file, language).await.into_diagnostic()
    })?;

    let mut kdl = dump_to_kdl(&file, &detection);
    kdl.autoformat();

    output
        .write_all(kdl.to_string().as_bytes())
        .into_diagnostic()?;

    Ok(())
}

/// Describes a [Detection] as a KDL document.
pub fn dump_to_kdl(file: &Path, detection: &Detection) -> KdlDocument {
    let mut kdl = KdlDocument::new();

    kdl.nodes_mut().push({
        let mut node = KdlNode::new("target");
        node.entries_mut()
            .push(file.display().to_string().into());
        node.entries_mut()
            .push(KdlEntry::new_prop("language", detection.language.as_str()));
        node
    });

    kdl.nodes_mut().push({
        let mut node = KdlNode::new("toolchain");

        match detection.missing_toolchain {
            Some(ref candidates) => {
                node.entries_mut().push(KdlEntry::new("missing"));

                let children = node.ensure_children();
                for candidate in candidates {
                    children.nodes_mut().push({
                        let mut node = KdlNode::new("candidate");
                        node.entries_mut().push(candidate.as_str().into());
                        node
                    });
                }
            }
            None => node.entries_mut().push(KdlEntry::new("ok")),
        }

        node
    });

    if let Some(ref arch) = detection.arch {
        kdl.nodes_mut().push({
            let mut node = KdlNode::new("arch");
            node.entries_mut().push(arch.token.as_str().into());

            if let Some(ref emulator) = arch.emulator {
                node.entries_mut()
                    .push(KdlEntry::new_prop("emulator", emulator.as_str()));
            }

            if let Some(arch_ok) = detection.arch_ok {
                node.entries_mut()
                    .push(KdlEntry::new_prop("match", arch_ok));
            }

            node
        });
    }

    kdl.nodes_mut().push({
        let mut node = KdlNode::new("host");
        node.entries_mut()
            .push(detection.host.arch.as_str().into());
        node.entries_mut()
            .push(KdlEntry::new_prop("os", detection.host.os.as_str()));
        node
    });

    if let Some(ref debugger) = detection.debugger {
        kdl.nodes_mut().push({
            let mut node = KdlNode::new("debugger");
            node.entries_mut().push(debugger.as_str().into());
            node
        });
    }

    kdl
}
