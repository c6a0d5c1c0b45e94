use std::path::Path;
use std::time::Duration;

use indoc::indoc;
use scry_engine::summary::{SessionDetails, extract};
use scry_engine::{DebugRequest, Error, Language};
use test_log::test;

use crate::common::{EM_AARCH64, Sandbox, elf64_header};

const VULN_C: &str = indoc! {r#"
    #include <string.h>

    void vulnerable_function(const char *input) {
        char buffer[16];
        strcpy(buffer, input);
    }

    int main(int argc, char **argv) {
        vulnerable_function(argc > 1 ? argv[1] : "AAAAAAAAAAAAAAAAAAAAAAAA");
        return 0;
    }
"#};

fn native(details: &SessionDetails) -> (&[String], &str, &Path, &str, bool) {
    match details {
        SessionDetails::Native {
            debugger_cmd,
            script,
            binary,
            arch_detected,
            arch_ok,
            ..
        } => (
            debugger_cmd.as_slice(),
            script.as_str(),
            binary.as_path(),
            arch_detected.as_str(),
            *arch_ok,
        ),
        SessionDetails::Interpreted { .. } => panic!("expected a native session"),
    }
}

#[test(tokio::test)]
async fn c_source_under_gdb() {
    let sandbox = Sandbox::new();
    sandbox.compiler("gcc").gdb("gdb", "echo 'rip 0x401136'");

    let source = sandbox.target("vuln.c", VULN_C);

    let output = sandbox
        .debugger()
        .debug(
            DebugRequest::new(&source)
                .break_at("vulnerable_function")
                .expressions("buffer"),
        )
        .await
        .unwrap();

    let gcc_args = sandbox.read("gcc.args");
    for flag in ["-g", "-O0", "-fno-stack-protector", "-no-pie", "execstack"] {
        assert!(gcc_args.lines().any(|a| a == flag), "{flag}");
    }

    let summary = &output.summary;
    assert_eq!(summary.language, Language::C);
    assert_eq!(summary.debugger, "gdb");
    assert!(summary.success);

    let (cmd, script, binary, arch, arch_ok) = native(&summary.session);
    assert!(script.lines().any(|l| l == "break vulnerable_function"));
    assert!(script.lines().any(|l| l == "print/x (void*)&buffer"));
    assert_eq!(binary, source.with_extension("ctf"));
    assert_eq!(arch, "i386:x86-64");
    assert!(arch_ok);
    assert_eq!(&cmd[1..3], ["-q", "-x"]);
    assert_eq!(cmd[5], binary.display().to_string());

    // the fake gdb echoes its script
    assert!(output.stdout.starts_with("set pagination off\n"));
    assert!(output.stdout.ends_with("rip 0x401136\n"));

    // artifacts released before returning
    assert!(!binary.exists());
    assert!(!Path::new(&cmd[3]).exists());

    let (_, stderr) = output.clone().into_parts();
    assert_eq!(extract(&stderr).unwrap().unwrap(), output.summary);
}

#[test(tokio::test)]
async fn foreign_binary_under_emulator() {
    let sandbox = Sandbox::new();
    sandbox.gdb("gdb-multiarch", "").tool(
        "qemu-aarch64",
        r#"printf '%s\n' "$@" > "$(dirname "$0")/qemu.args"
echo "qemu: gdbstub waiting on port $2" >&2
exec sleep 30"#,
    );

    let binary = sandbox.target("challenge", elf64_header(EM_AARCH64));

    let output = sandbox
        .debugger()
        .debug(DebugRequest::new(&binary).input_var("INPUT", "AAAA"))
        .await
        .unwrap();

    let summary = &output.summary;
    assert_eq!(summary.language, Language::Binary);
    assert_eq!(summary.debugger, "gdb-multiarch");

    let (cmd, script, bin, arch, arch_ok) = native(&summary.session);
    assert_eq!(arch, "aarch64");
    assert!(!arch_ok);
    assert_eq!(bin, binary);
    assert_eq!(cmd.len(), 4);

    let qemu_args = sandbox.read("qemu.args");
    let qemu_args: Vec<_> = qemu_args.lines().collect();
    assert_eq!(qemu_args[0], "-g");
    assert_eq!(&qemu_args[2..4], ["-E", "INPUT=AAAA"]);
    assert_eq!(qemu_args[4], binary.display().to_string());

    let port = qemu_args[1];
    assert!(script.lines().any(|l| l == format!("target remote :{port}")));
    assert!(script.lines().any(|l| l == "set architecture aarch64"));
    assert!(!script.contains("set environment"));

    let emulator_log = format!("\n--- qemu-aarch64 stderr ---\nqemu: gdbstub waiting on port {port}\n");
    assert!(summary.stderr.ends_with(&emulator_log));

    let (_, stderr) = output.clone().into_parts();
    assert!(stderr.contains(&emulator_log));

    // pre-built binaries are not the engine's to delete
    assert!(binary.exists());
}

#[test(tokio::test)]
async fn missing_emulator() {
    let sandbox = Sandbox::new();
    sandbox.gdb("gdb", "");

    let binary = sandbox.target("challenge", elf64_header(EM_AARCH64));

    let err = sandbox
        .debugger()
        .debug(DebugRequest::new(&binary))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::ArchMismatchUnbridgeable { emulator: Some(e), .. } if e == "qemu-aarch64"
    ));
}

#[test(tokio::test)]
async fn go_source_under_delve() {
    let sandbox = Sandbox::new();
    sandbox
        .tool(
            "go",
            r#"here=$(dirname "$0")
if [ "$1" = "env" ]; then echo linux; exit 0; fi
printf '%s\n' "$@" > "$here/go.args"
echo "$GOARCH/$GOOS" > "$here/go.env"
while [ $# -gt 0 ]; do
  [ "$1" = "-o" ] && out="$2"
  shift
done
cp "$here/template.elf" "$out""#,
        )
        .tool("dlv", r#"cat "$4"; echo; printf %s "$INPUT""#);

    let source = sandbox.target("main.go", "package main\n\nfunc main() {}\n");

    let output = sandbox
        .debugger()
        .debug(
            DebugRequest::new(&source)
                .break_at(3u32)
                .expressions("x, y")
                .input_var("INPUT", "BBBB"),
        )
        .await
        .unwrap();

    let go_args = sandbox.read("go.args");
    let go_args: Vec<_> = go_args.lines().collect();
    assert_eq!(&go_args[..3], ["build", "-gcflags", "all=-N -l"]);
    assert_eq!(sandbox.read("go.env").trim(), "amd64/linux");

    let summary = &output.summary;
    assert_eq!(summary.language, Language::Go);
    assert_eq!(summary.debugger, "dlv");

    let (cmd, script, ..) = native(&summary.session);
    assert_eq!(cmd[1], "exec");
    assert_eq!(cmd[3], "--init");
    assert!(script.lines().any(|l| l == "break main.go:3"));
    assert!(script.lines().any(|l| l == "print y"));

    // delve passes the input variables through its environment
    assert!(output.stdout.ends_with("exit\nBBBB"));
}

#[test(tokio::test)]
async fn go_never_falls_back_to_gdb() {
    let sandbox = Sandbox::new();
    sandbox
        .tool("go", r#"[ "$1" = "env" ] && exit 1; exit 0"#)
        .gdb("gdb", "");

    let source = sandbox.target("main.go", "package main\n");

    let err = sandbox
        .debugger()
        .debug(DebugRequest::new(&source))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::DebuggerNotFound { language: Language::Go, candidates } if candidates == ["dlv"]
    ));
}

#[test(tokio::test)]
async fn python_under_debugpy() {
    let sandbox = Sandbox::new();
    sandbox.tool("python3", r#"printf '%s\n' "$@""#);

    let script = sandbox.target("app.py", "print('hello')\n");

    let output = sandbox
        .debugger()
        .debug(DebugRequest::new(&script))
        .await
        .unwrap();

    let summary = &output.summary;
    assert_eq!(summary.language, Language::Python);
    assert_eq!(summary.debugger, "debugpy");
    assert!(summary.success);

    let SessionDetails::Interpreted { cmd } = &summary.session else {
        panic!("expected an interpreted session");
    };
    assert_eq!(&cmd[1..4], ["-m", "debugpy", "--listen"]);

    let listen = cmd[4].strip_prefix("127.0.0.1:").unwrap();
    assert!(listen.parse::<u16>().unwrap() > 0);

    let args: Vec<_> = output.stdout.lines().collect();
    assert_eq!(args, cmd[1..]);

    // nothing compiled
    assert!(!script.with_extension("ctf").exists());
}

#[test(tokio::test)]
async fn cleanup_after_timeout() {
    let sandbox = Sandbox::new();
    sandbox.compiler("gcc").gdb("gdb", "exec sleep 30");

    let source = sandbox.target("vuln.c", VULN_C);

    let output = sandbox
        .debugger()
        .debug(DebugRequest::new(&source).timeout(Duration::from_millis(500)))
        .await
        .unwrap();

    let summary = &output.summary;
    assert!(summary.timed_out);
    assert!(!summary.success);
    assert_eq!(summary.exit_code, None);

    // partial output is kept
    assert!(output.stdout.starts_with("set pagination off\n"));

    let (cmd, _, binary, ..) = native(&summary.session);
    assert!(!binary.exists());
    assert!(!Path::new(&cmd[3]).exists());
}

#[test(tokio::test)]
async fn compilation_failure() {
    let sandbox = Sandbox::new();
    sandbox.tool("clang", "echo \"vuln.c:5: error: expected ';'\" >&2\nexit 1");

    let source = sandbox.target("vuln.c", VULN_C);

    let err = sandbox
        .debugger()
        .debug(DebugRequest::new(&source))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::CompilationFailed { language: Language::C, stderr } if stderr.contains("expected ';'")
    ));
    assert!(!source.with_extension("ctf").exists());
}

#[test(tokio::test)]
async fn compilation_failure_keeps_source_named_like_artifact() {
    let sandbox = Sandbox::new();
    sandbox.tool("gcc", "echo boom >&2\nexit 1");

    let source = sandbox.target("exploit.ctf", VULN_C);

    let err = sandbox
        .debugger()
        .debug(DebugRequest::new(&source).language(Language::C))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::CompilationFailed { language: Language::C, .. }));
    assert_eq!(std::fs::read_to_string(&source).unwrap(), VULN_C);
}

#[test(tokio::test)]
async fn fatal_conditions() {
    let sandbox = Sandbox::new();
    let debugger = sandbox.debugger();

    let err = debugger
        .debug(DebugRequest::new(sandbox.bin().join("missing.c")))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::FileNotFound(_)));

    let notes = sandbox.target("notes.txt", "nothing to debug\n");
    let err = debugger.debug(DebugRequest::new(&notes)).await.unwrap_err();
    assert!(matches!(err, Error::UnsupportedLanguage(Language::Unknown)));

    let source = sandbox.target("main.rs", "fn main() {}\n");
    let err = debugger.debug(DebugRequest::new(&source)).await.unwrap_err();
    assert!(matches!(
        err,
        Error::ToolchainMissing { language: Language::Rust, candidates } if candidates == ["rustc", "cargo"]
    ));

    sandbox.tool("ruby", "exit 0");
    let script = sandbox.target("app.rb", "puts 1\n");
    let err = debugger.debug(DebugRequest::new(&script)).await.unwrap_err();
    assert!(matches!(err, Error::AdapterUnimplemented(Language::Ruby)));
}

#[test(tokio::test)]
async fn detect_without_running() {
    let sandbox = Sandbox::new();
    sandbox.gdb("gdb", "").gdb("lldb", "");

    let debugger = sandbox.debugger();

    let binary = sandbox.target("challenge", elf64_header(EM_AARCH64));
    let detection = debugger.detect(&binary, None).await.unwrap();
    assert_eq!(detection.language, Language::Binary);
    assert_eq!(detection.arch.unwrap().token, "aarch64");
    assert_eq!(detection.arch_ok, Some(false));
    assert_eq!(detection.debugger.as_deref(), Some("gdb"));
    assert!(detection.missing_toolchain.is_none());

    let source = sandbox.target("vuln.c", VULN_C);
    let detection = debugger.detect(&source, None).await.unwrap();
    assert_eq!(detection.language, Language::C);
    assert!(detection.arch.is_none());
    assert_eq!(
        detection.missing_toolchain.unwrap(),
        ["gcc".to_owned(), "clang".to_owned()]
    );

    let detection = debugger.detect(&source, Some(Language::Python)).await.unwrap();
    assert_eq!(detection.debugger.as_deref(), Some("debugpy"));
}
