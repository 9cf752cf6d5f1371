//! XML serialization.
//!
//! Turns a `Document`, or a node inside it, back into XML text with proper
//! escaping. Query results use it for `to_xml` and `inner_xml`.

pub mod xml;

pub use xml::{
    serialize, serialize_children, serialize_node, serialize_with_options, SerializeOptions,
};
