//! # Route Modules
//!
//! | Prefix                              | Module              |
//! |-------------------------------------|---------------------|
//! | `/v1/users/{user_id}/features/*`    | [`features`]        |
//! | `/v1/organizations/*`               | [`organizations`]   |
//! | `/v1/mandates/{id}/day-values`, `/revenue` | [`revenue`]  |
//! | `/v1/mandates/{id}/payroll/*`, `/employees` | [`payroll`] |

pub mod features;
pub mod organizations;
pub mod payroll;
pub mod revenue;
