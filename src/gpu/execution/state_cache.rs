use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use parking_lot::RwLock;

use crate::gpu::error::GpuError;
use crate::gpu::state::{
    BlendStateDescription, DepthStencilStateDescription, GraphicsPipelineDescription,
    RasterizerStateDescription, VertexLayoutDescription,
};

/// Hard cap some immediate-context drivers put on live state objects.
pub const DEFAULT_SOFT_LIMIT: usize = 4096;

/// Builds native fixed-function state objects for one backend.
pub trait StateFactory: Send + Sync {
    type BlendState: Clone + Send + Sync;
    type DepthStencilState: Clone + Send + Sync;
    type RasterizerState: Clone + Send + Sync;
    type InputLayout: Clone + Send + Sync;

    fn create_blend_state(
        &self,
        desc: &BlendStateDescription,
    ) -> Result<Self::BlendState, GpuError>;

    fn create_depth_stencil_state(
        &self,
        desc: &DepthStencilStateDescription,
    ) -> Result<Self::DepthStencilState, GpuError>;

    fn create_rasterizer_state(
        &self,
        desc: &RasterizerStateDescription,
        multisampled: bool,
    ) -> Result<Self::RasterizerState, GpuError>;

    fn create_input_layout(
        &self,
        layouts: &[VertexLayoutDescription],
    ) -> Result<Self::InputLayout, GpuError>;
}

// ----- Generic cache --------------------------------------------------------

/// Map from a value-equal description to the native object built for it.
///
/// Lookups borrow the caller's description; the key is only cloned, deeply,
/// when an entry is inserted.
pub struct StateCache<K, V> {
    name: &'static str,
    soft_limit: usize,
    entries: RwLock<HashMap<K, V>>,
}

impl<K: Eq + Hash, V: Clone> StateCache<K, V> {
    pub fn new(name: &'static str, soft_limit: usize) -> Self {
        Self {
            name,
            soft_limit,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn get_or_create<Q, F>(&self, key: &Q, create: F) -> Result<V, GpuError>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
        F: FnOnce(&Q) -> Result<V, GpuError>,
    {
        if let Some(v) = self.entries.read().get(key) {
            return Ok(v.clone());
        }

        let mut entries = self.entries.write();
        if let Some(v) = entries.get(key) {
            return Ok(v.clone());
        }

        let value = create(key)?;
        entries.insert(key.to_owned(), value.clone());
        log::debug!("{} cache: miss, {} live objects", self.name, entries.len());
        if entries.len() == self.soft_limit + 1 {
            log::warn!(
                "{} cache holds more than {} native objects",
                self.name,
                self.soft_limit
            );
        }
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

// ----- Pipeline state -------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RasterizerKey {
    pub desc: RasterizerStateDescription,
    pub multisampled: bool,
}

/// Native state objects a graphics pipeline is built from.
pub struct PipelineStates<F: StateFactory> {
    pub blend: F::BlendState,
    pub depth_stencil: F::DepthStencilState,
    pub rasterizer: F::RasterizerState,
    pub input_layout: F::InputLayout,
}

/// One cache per state category, owned by the device and shared by every
/// pipeline created from it.
pub struct PipelineStateCache<F: StateFactory> {
    blend: StateCache<BlendStateDescription, F::BlendState>,
    depth_stencil: StateCache<DepthStencilStateDescription, F::DepthStencilState>,
    rasterizer: StateCache<RasterizerKey, F::RasterizerState>,
    input_layout: StateCache<Vec<VertexLayoutDescription>, F::InputLayout>,
}

impl<F: StateFactory> PipelineStateCache<F> {
    pub fn new(soft_limit: usize) -> Self {
        Self {
            blend: StateCache::new("blend", soft_limit),
            depth_stencil: StateCache::new("depth-stencil", soft_limit),
            rasterizer: StateCache::new("rasterizer", soft_limit),
            input_layout: StateCache::new("input-layout", soft_limit),
        }
    }

    pub fn blend_state(
        &self,
        factory: &F,
        desc: &BlendStateDescription,
    ) -> Result<F::BlendState, GpuError> {
        self.blend.get_or_create(desc, |d| factory.create_blend_state(d))
    }

    pub fn depth_stencil_state(
        &self,
        factory: &F,
        desc: &DepthStencilStateDescription,
    ) -> Result<F::DepthStencilState, GpuError> {
        self.depth_stencil.get_or_create(desc, |d| factory.create_depth_stencil_state(d))
    }

    pub fn rasterizer_state(
        &self,
        factory: &F,
        desc: &RasterizerStateDescription,
        multisampled: bool,
    ) -> Result<F::RasterizerState, GpuError> {
        let key = RasterizerKey {
            desc: *desc,
            multisampled,
        };
        self.rasterizer
            .get_or_create(&key, |k| factory.create_rasterizer_state(&k.desc, k.multisampled))
    }

    pub fn input_layout(
        &self,
        factory: &F,
        layouts: &[VertexLayoutDescription],
    ) -> Result<F::InputLayout, GpuError> {
        self.input_layout.get_or_create(layouts, |l| factory.create_input_layout(l))
    }

    pub fn pipeline_states(
        &self,
        factory: &F,
        desc: &GraphicsPipelineDescription,
    ) -> Result<PipelineStates<F>, GpuError> {
        Ok(PipelineStates {
            blend: self.blend_state(factory, &desc.blend_state)?,
            depth_stencil: self.depth_stencil_state(factory, &desc.depth_stencil_state)?,
            rasterizer: self.rasterizer_state(
                factory,
                &desc.rasterizer_state,
                desc.multisampled,
            )?,
            input_layout: self.input_layout(factory, &desc.vertex_layouts)?,
        })
    }

    /// Live objects per category: blend, depth-stencil, rasterizer, input layout.
    pub fn counts(&self) -> [usize; 4] {
        [
            self.blend.len(),
            self.depth_stencil.len(),
            self.rasterizer.len(),
            self.input_layout.len(),
        ]
    }
}
