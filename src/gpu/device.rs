use std::marker::PhantomData;

#[cfg(feature = "encore-serde")]
use serde::{Deserialize, Serialize};

use super::cmd::{CommandList, Executable, Initial, OffsetAlignment};
use super::driver::DEFAULT_BLOCK_SIZE;
use super::error::GpuError;
use super::execution::state_cache::DEFAULT_SOFT_LIMIT;
use super::execution::{
    ExecutionThread, PipelineStateCache, ResourceLayout, ResourceLayoutDescription, ResourceSet,
    ResourceSetDescription,
};
use super::state::{ComputePipelineDescription, GraphicsPipelineDescription};
use super::{Backend, BackendDevice};
use crate::ir::{CommandExecutor, ReplayStats};
use crate::utils::staging_pool::DEFAULT_MIN_BLOCK_SIZE;
use crate::utils::{SharedStagingPool, StagingMemoryPool};

/// Device-wide tuning knobs.
#[cfg_attr(feature = "encore-serde", derive(Serialize, Deserialize), serde(default))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub debug_name: String,
    /// Capacity of each entry-buffer block of a command list.
    pub entry_block_size: usize,
    /// Smallest staging block size class.
    pub staging_min_block_size: u32,
    /// Live objects per state cache before a warning is logged.
    pub state_cache_soft_limit: usize,
    pub execution_thread_name: String,
    /// Dynamic uniform buffer offsets must be multiples of this.
    pub uniform_offset_alignment: u32,
    pub structured_offset_alignment: u32,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            debug_name: "encore".to_string(),
            entry_block_size: DEFAULT_BLOCK_SIZE,
            staging_min_block_size: DEFAULT_MIN_BLOCK_SIZE,
            state_cache_soft_limit: DEFAULT_SOFT_LIMIT,
            execution_thread_name: "encore-exec".to_string(),
            uniform_offset_alignment: 256,
            structured_offset_alignment: 16,
        }
    }
}

impl DeviceInfo {
    pub fn validate(&self) -> Result<(), GpuError> {
        if self.entry_block_size == 0 {
            return Err(GpuError::Config("entry_block_size must be non-zero".into()));
        }
        if self.staging_min_block_size == 0 {
            return Err(GpuError::Config(
                "staging_min_block_size must be non-zero".into(),
            ));
        }
        if self.uniform_offset_alignment == 0 || self.structured_offset_alignment == 0 {
            return Err(GpuError::Config(
                "dynamic offset alignments must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(feature = "encore-serde")]
mod serde_support {
    use std::fs;

    use anyhow::{Context as _, Result};

    use super::DeviceInfo;

    impl DeviceInfo {
        /// Reads a device configuration. Missing keys keep their defaults.
        pub fn from_yaml(yaml: &str) -> Result<Self> {
            let info: DeviceInfo =
                serde_yaml::from_str(yaml).context("parsing device info YAML")?;
            info.validate().context("validating device info")?;
            Ok(info)
        }

        pub fn from_yaml_file(path: &str) -> Result<Self> {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("loading device info YAML file '{}'", path))?;
            Self::from_yaml(&contents).with_context(|| format!("in '{}'", path))
        }
    }
}

/// One logical device: owns the native backend device, the staging pool
/// shared by its command lists and the fixed-function state caches.
pub struct Device<B: Backend, D: BackendDevice<B>> {
    info: DeviceInfo,
    native: D,
    staging: SharedStagingPool,
    states: PipelineStateCache<D>,
    _backend: PhantomData<B>,
}

impl<B: Backend, D: BackendDevice<B>> Device<B, D> {
    pub fn new(native: D, info: DeviceInfo) -> Result<Self, GpuError> {
        info.validate()?;
        log::debug!(
            "device '{}' on {} backend",
            info.debug_name,
            native.kind().name()
        );
        Ok(Self {
            staging: StagingMemoryPool::new(info.staging_min_block_size).into_shared(),
            states: PipelineStateCache::new(info.state_cache_soft_limit),
            native,
            info,
            _backend: PhantomData,
        })
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    pub fn native(&self) -> &D {
        &self.native
    }

    pub fn staging_pool(&self) -> &SharedStagingPool {
        &self.staging
    }

    pub fn state_cache(&self) -> &PipelineStateCache<D> {
        &self.states
    }

    pub fn create_resource_layout(
        &self,
        desc: &ResourceLayoutDescription,
    ) -> Result<ResourceLayout, GpuError> {
        Ok(ResourceLayout::new(self.native.kind(), desc)?)
    }

    pub fn create_resource_set(
        &self,
        desc: ResourceSetDescription<B>,
    ) -> Result<ResourceSet<B>, GpuError> {
        if desc.layout.slots().backend() != self.native.kind() {
            return Err(GpuError::Backend(format!(
                "resource layout was created for the {} backend",
                desc.layout.slots().backend().name()
            )));
        }
        Ok(ResourceSet::new(desc)?)
    }

    pub fn create_graphics_pipeline(
        &self,
        desc: &GraphicsPipelineDescription,
    ) -> Result<B::Pipeline, GpuError> {
        let states = self.states.pipeline_states(&self.native, desc)?;
        self.native.create_graphics_pipeline(desc, states)
    }

    pub fn create_compute_pipeline(
        &self,
        desc: &ComputePipelineDescription,
    ) -> Result<B::Pipeline, GpuError> {
        self.native.create_compute_pipeline(desc)
    }

    pub fn create_command_list(&self) -> CommandList<B, Initial> {
        let alignment = OffsetAlignment {
            uniform: self.info.uniform_offset_alignment,
            structured: self.info.structured_offset_alignment,
        };
        CommandList::new(self.staging.clone(), self.info.entry_block_size)
            .with_offset_alignment(alignment)
    }

    /// Replays `list` on the calling thread.
    ///
    /// Global-state backends reject this; their lists go through
    /// [`Device::spawn_execution_thread`].
    pub fn submit<E: CommandExecutor<B> + ?Sized>(
        &self,
        list: &CommandList<B, Executable>,
        executor: &mut E,
    ) -> Result<ReplayStats, GpuError> {
        let kind = self.native.kind();
        if kind.requires_execution_thread() {
            return Err(GpuError::Backend(format!(
                "the {} backend executes only on its execution thread",
                kind.name()
            )));
        }
        Ok(list.execute(executor)?)
    }

    pub fn spawn_execution_thread<E>(
        &self,
        executor: E,
    ) -> Result<ExecutionThread<B, E>, GpuError>
    where
        E: CommandExecutor<B> + Send + 'static,
    {
        ExecutionThread::spawn(&self.info.execution_thread_name, executor)
    }
}
