//! GenICam consumer side: feature access, transport sessions and payload
//! decoding.

pub mod buffer;
pub mod chunks;
pub mod components;
pub mod configure;
pub mod features;
pub mod node_map;
pub mod producer;
pub mod transport;

pub use buffer::{Buffer, Component, ComponentData, PixelFormat};
pub use features::{FeatureSchema, FeatureValue, PHOXI_SCHEMA};
pub use node_map::{Features, NodeMap};
pub use transport::{DeviceInfo, FetchedBuffer, Harvester, ImageAcquirer, Producer, RemoteDevice};
