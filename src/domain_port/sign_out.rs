/// Clears the local session after an unrecoverable auth failure.
///
/// Overlapping failures can fire it several times in a row, so
/// implementations must tolerate repeated calls.
pub trait SignOut: Send + Sync {
    fn sign_out(&self);
}

impl<F> SignOut for F
where
    F: Fn() + Send + Sync,
{
    fn sign_out(&self) {
        self()
    }
}
