//! Parameter schema: typed values, parameter slots and descriptors.
//!
//! # Architecture
//!
//! ```text
//! Descriptor ──► [Parameter] ──► ParamValue
//!            ├──► [InputSlot]  (label, required, binding)
//!            ├──► OutputKind
//!            └──► UpdateRule   (values → enabled flags)
//! ```

pub mod descriptor;
pub mod parameter;
pub mod value;

pub use descriptor::{Descriptor, InputSlot, UpdateRule};
pub use parameter::{Limits, ParamKind, Parameter};
pub use value::{FromParamValue, ParamValue};
