// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod controller;
pub mod debounce;
pub mod error;
pub mod forms;
pub mod ids;
pub mod model;
pub mod pagination;
pub mod query;
pub mod selection;
pub mod state;

pub use controller::*;
pub use debounce::*;
pub use error::*;
pub use forms::*;
pub use ids::*;
pub use model::*;
pub use pagination::*;
pub use query::*;
pub use selection::*;
pub use state::*;
