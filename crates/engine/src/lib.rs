pub use error::EngineError;
pub use expenses::Expense;
pub use groups::Group;
pub use money::Amount;
pub use ops::{Engine, EngineBuilder, ExpenseDetail, MemberProfile, SplitDetail};
pub use percent::Percent;
pub use settlement::{SplitStatus, SplitStatusUpdate};
pub use split::{Share, SplitKind, SplitSpec};
pub use splits::Split;
pub use users::User;

mod error;
mod expenses;
mod group_members;
mod groups;
mod money;
mod ops;
mod percent;
mod settlement;
mod split;
mod splits;
mod users;

type ResultEngine<T> = Result<T, EngineError>;
