//! GPIO controller interface.

use crate::error::HwResult;

pub trait GpioController: Sync {
    /// Whether `gpio` names a line that exists on this board.
    fn is_valid(&self, gpio: i32) -> bool {
        gpio >= 0
    }

    fn request(&self, gpio: i32, label: &'static str) -> HwResult<()>;

    fn direction_output(&self, gpio: i32, high: bool) -> HwResult<()>;

    fn set_value(&self, gpio: i32, high: bool);

    fn free(&self, gpio: i32);
}
