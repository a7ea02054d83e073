mod actor;
mod course;
mod progress;
mod segment;
mod state;

pub use actor::{Actor, ActorIdentity};
pub use course::{Course, CourseError, PracticeKind, ScreenDef};
pub use progress::{CorrectAlert, ScreenProgress, SuspendData};
pub use segment::{Segment, SegmentError, SegmentKey};
pub use state::{CourseState, CourseStatus, ScreenPosition};
