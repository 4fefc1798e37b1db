//! scenecanvas is a retained-mode 2-D scene graph with a software rasterizer.
//!
//! A [`Display`] owns one scene and wires its parts together:
//!
//! - Renderers ([`RenderCache`]) turn data into scene subtrees through a [`SceneTransform`]
//!   and swap them in without visual gaps
//! - [`AnimationState`] steps through animation samples and selects animation switches
//! - [`FrameCache`] keeps one raster per animation step and redraws only the displayed one
//! - [`FrameDistributor`] hands presented frames to observers and [`FrameSink`]s
#![forbid(unsafe_code)]

mod foundation;

pub(crate) mod animation;
pub(crate) mod cache;
pub(crate) mod display;
pub(crate) mod render;
pub(crate) mod scene;
pub(crate) mod sink;

pub use crate::foundation::config::{CanvasConfig, ChildOrder, StepPolicy};
pub use crate::foundation::core::{Affine, Point, Rect, Rgba8, Vec2, Viewport};
pub use crate::foundation::error::{CanvasError, CanvasResult};

pub use crate::animation::state::{AnimationEvent, AnimationState, Direction};
pub use crate::cache::render_cache::{
    RebuildOutcome, RenderCache, RendererKind, SceneTransform, TransformError,
};
pub use crate::display::{Display, RendererId};
pub use crate::render::frame_cache::{FrameCache, FrameCacheStats};
pub use crate::render::overlay::Overlay;
pub use crate::render::raster::Raster;
pub use crate::scene::document::SceneDocument;
pub use crate::scene::geometry::{
    Appearance, GeometryArray, GeometryBuilder, GeometryKind, LineStyle, SourceImage,
};
pub use crate::scene::graph::{Group, Node, NodeId, SceneGraph, Switch};
pub use crate::scene::subtree::{Subtree, SwitchAnimation};
pub use crate::sink::distributor::{FrameDistributor, FrameDone, FrameMsg, SinkPump};
pub use crate::sink::frame_sink::{FrameSink, InMemorySink, SinkConfig};
