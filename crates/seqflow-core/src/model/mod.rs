pub mod cell;
pub mod facts;
pub mod ordered;
pub mod record;
pub mod session;
pub mod table;

pub use cell::{CellType, CellValue};
pub use facts::{Fact, FactSheet};
pub use record::{StepArgs, StepRecord};
pub use session::{SessionHeader, SessionId, SessionSnapshot};
pub use table::{RowRef, Table, TableColumn};
