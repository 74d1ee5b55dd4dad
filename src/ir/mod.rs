//! # Intermediate Representation
//!
//! The parser lowers effect source straight into SPIR-V-shaped instruction
//! nodes. Nodes live in append-only sections so declarations found late in the
//! single pass (a type needed by a later variable, a constant, a name string)
//! land in the right place without reordering code that was already emitted.
//!
//! ## Module Structure
//!
//! ```text
//! ir/
//! ├── mod.rs      # This file - re-exports
//! ├── op.rs       # Op codes, storage classes, decoration constants
//! ├── node.rs     # Id, SectionId, Node
//! ├── builder.rs  # IrBuilder: id allocation, lookup, type interning, casts
//! └── dump.rs     # Text listing
//! ```
//!
//! ## Sections
//!
//! | Section | Contents |
//! |---------|----------|
//! | `Entries` | extended instruction imports, `EntryPoint` |
//! | `Strings` | `Name`, `MemberName`, `String` |
//! | `Annotations` | `Decorate`, `MemberDecorate` |
//! | `Variables` | types, constants, global `Variable`s |
//! | `Functions` | function bodies |
//! | `Temporary` | scratch code of global initializers |

mod builder;
mod dump;
mod node;
mod op;

pub use builder::IrBuilder;
pub use dump::{dump, format_node};
pub use node::{Id, Node, SectionId};
pub use op::{control, decoration, execution_model, Op, StorageClass};
