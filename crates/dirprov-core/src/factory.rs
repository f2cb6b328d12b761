// ── Engine factory ──
//
// One provisioning engine per application. The factory is an ordinary
// value the application owns (typically in a `static`), not a hidden
// global inside this crate.

use std::sync::OnceLock;

use crate::engine::Provisioning;
use crate::error::CoreError;

/// Guards construction of the application's single engine.
#[derive(Debug, Default)]
pub struct ProvisioningFactory {
    instance: OnceLock<Provisioning>,
}

impl ProvisioningFactory {
    pub const fn new() -> Self {
        Self {
            instance: OnceLock::new(),
        }
    }

    /// Install an engine. A second install fails.
    pub fn install(&self, engine: Provisioning) -> Result<&Provisioning, CoreError> {
        self.instance
            .set(engine)
            .map_err(|_| CoreError::Internal("provisioning engine already installed".into()))?;
        self.get()
            .ok_or_else(|| CoreError::Internal("provisioning engine vanished after install".into()))
    }

    /// The engine, built by `init` on first use.
    pub fn get_or_init(&self, init: impl FnOnce() -> Provisioning) -> &Provisioning {
        self.instance.get_or_init(init)
    }

    pub fn get(&self) -> Option<&Provisioning> {
        self.instance.get()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use dirprov_api::MemoryDirectory;

    use super::*;
    use crate::config::EngineConfig;

    fn engine() -> Provisioning {
        Provisioning::new(Arc::new(MemoryDirectory::new()), EngineConfig::default())
    }

    #[test]
    fn second_install_fails() {
        let factory = ProvisioningFactory::new();
        assert!(factory.get().is_none());
        factory.install(engine()).unwrap();
        assert!(factory.install(engine()).is_err());
    }

    #[test]
    fn get_or_init_builds_once() {
        let factory = ProvisioningFactory::new();
        let mut calls = 0;
        factory.get_or_init(|| {
            calls += 1;
            engine()
        });
        factory.get_or_init(|| {
            calls += 1;
            engine()
        });
        assert_eq!(calls, 1);
    }
}
