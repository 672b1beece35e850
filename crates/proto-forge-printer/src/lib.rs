//! # proto-forge-printer
//!
//! Template printer for code generators.
//!
//! A [`Printer`] expands `$name$` templates against stacked frames of
//! [`Vars`], keeps track of indentation, and can report which byte ranges
//! of its output were produced from which schema element.
//!
//! # Example
//!
//! ```
//! use proto_forge_printer::{AnnotationTarget, Printer, PrinterOptions, Vars};
//!
//! let mut annotations = Vec::new();
//! let mut p = Printer::with_collector(PrinterOptions::default(), &mut annotations);
//! let vars = Vars::new()
//!     .set("name", "Order")
//!     .annotation("name", AnnotationTarget::new("shop.proto", vec![4, 0, 1]));
//! p.emit(vars, "struct $_start$name$$name$$_end$name$;\n");
//! assert_eq!(p.into_string(), "struct Order;\n");
//! assert_eq!((annotations[0].start, annotations[0].end), (7, 12));
//! ```

mod annotation;
mod error;
mod printer;
mod vars;

pub use annotation::{Annotation, AnnotationCollector, AnnotationTarget, Semantic};
pub use error::TemplateError;
pub use printer::{Printer, PrinterOptions};
pub use vars::{Callback, Value, Vars};
