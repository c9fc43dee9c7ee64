/// Emit a tracing event only when the scope's configured level allows it.
///
/// `scoped_log!(DEBUG, SCOPE_CLIMB, hand = ?hand, "grip")`
#[macro_export]
macro_rules! scoped_log {
    ($level:ident, $scope:expr, $($arg:tt)*) => {{
        let log_config = $crate::logging::get_log_config();
        if log_config.should_log($scope, $crate::logging::Level::$level) {
            $crate::logging::event!($crate::logging::Level::$level, scope = $scope, $($arg)*);
        }
    }};
}
