// Function values: the named helpers a template can call.
//
// A render call builds one FunctionValueSet from layered sources (renderer
// bindings, registered makers, call-site overrides) and hands it to every
// template it executes.

mod registry;
mod set;
mod value;

pub use registry::{FuncMapMaker, FuncMapRegistry};
pub use set::FunctionValueSet;
pub use value::{Composition, FunctionValue, HelperResult, HelperScope, Html, Locals, Value};
