pub mod clock;
pub mod errors;
pub mod shutdown;

pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::{
    BackfillError, CollectorError, DataAccessError, MonitoringError, ProcessorError,
    SchedulerError,
};
pub use shutdown::ShutdownSignal;
