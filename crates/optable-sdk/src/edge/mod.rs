//! Edge API operations: request shapes and outcome classification.
//!
//! | Operation | Method | Path         | Body                                  |
//! |-----------|--------|--------------|---------------------------------------|
//! | init      | POST   | `/init`      | `[]`                                  |
//! | identify  | POST   | `/identify`  | `["e:…", "a:…", "c:…"]`               |
//! | profile   | POST   | `/profile`   | `{"traits": {…}}`                     |
//! | targeting | GET    | `/targeting` | none                                  |
//! | witness   | POST   | `/witness`   | `{"event": "…", "properties": {…}}`   |

pub mod operation;
pub mod outcome;
pub mod request;

pub use operation::Operation;
pub use outcome::{classify, parse_targeting};
pub use request::{EdgeRequest, Properties, Traits};
