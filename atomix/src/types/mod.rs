pub mod cmp;
pub mod record;
pub mod table_def;
pub mod value;

pub use cmp::{CmpOp, CmpOpError, Direction};
pub use record::Record;
pub use table_def::{Column, FIRST_USER_PREFIX, IndexDef, TableDef, TableDefBuilder, TableDefError};
pub use value::{Value, ValueType};
