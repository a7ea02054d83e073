use thiserror::Error;

use crate::duration::TimeFormatError;
use crate::model::{CourseError, SegmentError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Segment(#[from] SegmentError),
    #[error(transparent)]
    Time(#[from] TimeFormatError),
}
