//! Markup grammar module

pub mod grammar;
pub mod model;

pub use grammar::{Config, PrintMode, Xml};
pub use model::{Attributes, Document, Element, Node};
