pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("stop before start")]
    NotStarted,

    #[error("already stopped")]
    AlreadyStopped,
}
