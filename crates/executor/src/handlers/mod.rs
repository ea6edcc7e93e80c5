//! Command handlers organized by scope.
//!
//! | Module | Commands |
//! |--------|----------|
//! | `store` | `CreateIndex`, `DeleteIndex`, `ListIndexes`, `ImportIndex`, `IndexExists`, `Flush` |
//! | `index` | `InitIndex`, `ResizeIndex`, `AddItems`, `DeleteItem`, `GetIds`, `GetElements`, `Count`, `Info`, `QueryIndex` |

pub mod index;
pub mod store;
