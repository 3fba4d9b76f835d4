/// Pick `if_true` when `condition` holds, otherwise `if_false`
///
/// Used by the reporting code to turn flags into cells and markers.
#[inline]
pub fn select<T>(condition: bool, if_true: T, if_false: T) -> T {
    if condition {
        if_true
    } else {
        if_false
    }
}
