//! Marker types naming what a [`Tracked`] index points at.

pub use crate::utils::Tracked;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Buffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Texture;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Framebuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pipeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceSet;

/// Debug group and marker names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label;
