use tracing::trace;

use crate::compiler::Translator;
use crate::glsl::OutputType;
use crate::resources::{BuiltInResources, ShaderSpec, ShaderStage};

/// Idle translators kept per stage.
pub const MAX_POOL_SIZE: usize = 32;

/// Recycles [`Translator`]s of one (spec, output, resources) configuration. Callers that share a
/// pool across threads wrap it in their own lock.
pub struct CompilerPool {
    spec: ShaderSpec,
    output: OutputType,
    resources: BuiltInResources,
    free: [Vec<Translator>; 3],
}

impl CompilerPool {
    pub fn new(spec: ShaderSpec, output: OutputType, resources: BuiltInResources) -> Self {
        Self {
            spec,
            output,
            resources,
            free: Default::default(),
        }
    }

    pub fn idle(&self, stage: ShaderStage) -> usize {
        self.free[stage.index()].len()
    }

    pub fn get_instance(&mut self, stage: ShaderStage) -> Translator {
        if let Some(translator) = self.free[stage.index()].pop() {
            trace!(%stage, "reusing pooled translator");
            return translator;
        }
        Translator::new(stage, self.spec, self.output, self.resources.clone())
    }

    /// Returns `translator` to the pool. Instances of another configuration, and instances
    /// beyond [`MAX_POOL_SIZE`], are dropped.
    pub fn put_instance(&mut self, mut translator: Translator) {
        if translator.spec() != self.spec
            || translator.output() != self.output
            || *translator.resources() != self.resources
        {
            return;
        }
        let free = &mut self.free[translator.stage().index()];
        if free.len() < MAX_POOL_SIZE {
            translator.reset();
            free.push(translator);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> CompilerPool {
        CompilerPool::new(ShaderSpec::WebGl, OutputType::Essl, BuiltInResources::default())
    }

    #[test]
    fn instances_are_recycled_per_stage() {
        let mut pool = pool();
        let vertex = pool.get_instance(ShaderStage::Vertex);
        assert_eq!(vertex.stage(), ShaderStage::Vertex);
        pool.put_instance(vertex);
        assert_eq!(pool.idle(ShaderStage::Vertex), 1);
        assert_eq!(pool.idle(ShaderStage::Fragment), 0);

        let fragment = pool.get_instance(ShaderStage::Fragment);
        assert_eq!(fragment.stage(), ShaderStage::Fragment);
        assert_eq!(pool.idle(ShaderStage::Vertex), 1);

        let again = pool.get_instance(ShaderStage::Vertex);
        assert_eq!(again.stage(), ShaderStage::Vertex);
        assert_eq!(pool.idle(ShaderStage::Vertex), 0);
    }

    #[test]
    fn pool_is_bounded() {
        let mut pool = pool();
        let translators: Vec<_> = (0..MAX_POOL_SIZE + 3)
            .map(|_| pool.get_instance(ShaderStage::Compute))
            .collect();
        for translator in translators {
            pool.put_instance(translator);
        }
        assert_eq!(pool.idle(ShaderStage::Compute), MAX_POOL_SIZE);
    }

    #[test]
    fn foreign_instances_are_dropped() {
        let mut pool = pool();
        let other = Translator::new(
            ShaderStage::Vertex,
            ShaderSpec::Gles3,
            OutputType::Essl,
            BuiltInResources::default(),
        );
        pool.put_instance(other);
        assert_eq!(pool.idle(ShaderStage::Vertex), 0);
    }
}
