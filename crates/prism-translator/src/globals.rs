//! Process-wide state shared by all translators: the built-in registries.
//!
//! The tables live as long as at least one [`GlobalsHandle`] does. Dropping the last handle
//! frees them; the next [`GlobalsHandle::acquire`] starts from empty tables again.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use hashbrown::HashMap;
use tracing::debug;

use crate::builtins::build_registry;
use crate::compiler::Translator;
use crate::glsl::OutputType;
use crate::resources::{BuiltInResources, ShaderSpec, ShaderStage};
use crate::symbol_table::BuiltInRegistry;

type RegistryKey = (ShaderStage, ShaderSpec, BuiltInResources);

#[derive(Default)]
struct Shared {
    registries: Mutex<HashMap<RegistryKey, Arc<BuiltInRegistry>>>,
}

static GLOBALS: Mutex<Weak<Shared>> = Mutex::new(Weak::new());

/// Scoped reference to the shared translator tables.
#[derive(Clone)]
pub struct GlobalsHandle {
    shared: Arc<Shared>,
}

impl GlobalsHandle {
    pub fn acquire() -> Self {
        let mut slot = GLOBALS.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(shared) = slot.upgrade() {
            return Self { shared };
        }
        debug!("initializing translator globals");
        let shared = Arc::new(Shared::default());
        *slot = Arc::downgrade(&shared);
        Self { shared }
    }

    /// Number of live handles, this one included.
    pub fn users(&self) -> usize {
        Arc::strong_count(&self.shared)
    }

    /// The registry for `(stage, spec, resources)`, built on first use.
    pub fn registry(
        &self,
        stage: ShaderStage,
        spec: ShaderSpec,
        resources: &BuiltInResources,
    ) -> Arc<BuiltInRegistry> {
        let mut registries = self
            .shared
            .registries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let key = (stage, spec, resources.clone());
        if let Some(registry) = registries.get(&key) {
            debug!(%stage, ?spec, "built-in registry cache hit");
            return Arc::clone(registry);
        }
        let registry = build_registry(stage, spec, resources);
        registries.insert(key, Arc::clone(&registry));
        registry
    }

    pub fn cached_registries(&self) -> usize {
        self.shared
            .registries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// A translator sharing the cached registry for its configuration.
    pub fn translator(
        &self,
        stage: ShaderStage,
        spec: ShaderSpec,
        output: OutputType,
        resources: BuiltInResources,
    ) -> Translator {
        let builtins = self.registry(stage, spec, &resources);
        Translator::with_builtins(stage, spec, output, resources, builtins)
    }
}

impl Drop for GlobalsHandle {
    fn drop(&mut self) {
        if Arc::strong_count(&self.shared) == 1 {
            debug!("releasing translator globals");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registries_are_shared_between_handles() {
        let first = GlobalsHandle::acquire();
        let second = GlobalsHandle::acquire();
        assert!(second.users() >= 2);

        let resources = BuiltInResources {
            max_draw_buffers: 3,
            ..BuiltInResources::default()
        };
        let a = first.registry(ShaderStage::Fragment, ShaderSpec::WebGl, &resources);
        let b = second.registry(ShaderStage::Fragment, ShaderSpec::WebGl, &resources);
        assert!(Arc::ptr_eq(&a, &b));

        let other = second.registry(ShaderStage::Vertex, ShaderSpec::WebGl, &resources);
        assert!(!Arc::ptr_eq(&a, &other));
    }

    #[test]
    fn translators_reuse_the_cached_registry() {
        let globals = GlobalsHandle::acquire();
        let resources = BuiltInResources {
            max_draw_buffers: 5,
            ..BuiltInResources::default()
        };
        let translator = globals.translator(
            ShaderStage::Fragment,
            ShaderSpec::Gles2,
            OutputType::Essl,
            resources.clone(),
        );
        let cached = globals.registry(ShaderStage::Fragment, ShaderSpec::Gles2, &resources);
        assert!(Arc::ptr_eq(translator.builtins(), &cached));
    }
}
