use super::Debugger;
use crate::arch::{HostInfo, host_info};
use crate::tables::Tables;
use crate::toolchain::{SearchPath, ToolLocator};

/// Builder for [Debugger].
///
/// It is usually created by calling [Debugger::builder], and allows to
/// substitute the lookup tables, the tool locator or the host description.
pub struct Builder<L> {
    tables: Tables,
    locator: L,
    host: Option<HostInfo>,
}

impl Builder<SearchPath> {
    pub(super) fn new() -> Self {
        Self {
            tables: Tables::default(),
            locator: SearchPath::from_env(),
            host: None,
        }
    }
}

impl<L> Builder<L> {
    /// Specifies how executables are resolved.
    pub fn with_locator<M: ToolLocator>(self, locator: M) -> Builder<M> {
        Builder {
            tables: self.tables,
            locator,
            host: self.host,
        }
    }

    /// Specifies the lookup tables.
    pub fn with_tables(mut self, tables: Tables) -> Self {
        self.tables = tables;
        self
    }

    /// Specifies the host description, instead of probing the machine.
    pub fn with_host(mut self, host: HostInfo) -> Self {
        self.host = Some(host);
        self
    }
}

impl<L: ToolLocator> Builder<L> {
    /// Builds the debugger.
    pub fn build(self) -> Debugger<L> {
        let host = self.host.unwrap_or_else(host_info);

        tracing::debug!(arch = %host.arch, os = %host.os, "host");

        Debugger {
            tables: self.tables,
            locator: self.locator,
            host,
        }
    }
}
