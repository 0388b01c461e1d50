/// Reference-sequence lookup collaborator, spec.md §6: out of scope for the
/// validator itself (no normalization/left-alignment is performed here),
/// but the interface is declared so a future caller can supply one without
/// reaching into the validator's internals.
pub trait ReferenceProvider {
    /// Returns the base string for `contig[start..start + length]`, or an
    /// empty string if `contig` is unknown to this provider.
    fn sequence(&self, contig: &str, start: u64, length: u64) -> String;
}
