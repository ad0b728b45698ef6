use super::frame::{Frame, StackFrame};

/// Substrings that mark a function as part of the allocator rather than a caller of it.
pub const ALLOCATOR_WRAPPERS: &[&str] = &["malloc", "calloc", "xrealloc"];

/// Whether `function` is one of the allocator's own entry points or wrappers around them.
pub fn is_allocator_wrapper(function: &str) -> bool {
    ALLOCATOR_WRAPPERS
        .iter()
        .any(|wrapper| function.contains(wrapper))
}

/// Whether the stack originates in the target binary.
///
/// The frame at index 0 is the allocator entry point the probe fired on, so the frame one level
/// above it decides: it must exist, parse, and belong to exactly `target`.
pub fn validate_origin(frames: &[Frame<'_>], target: &str) -> bool {
    frames
        .get(1)
        .and_then(Frame::parsed)
        .map_or(false, |frame| frame.library == target)
}

/// The ustack strategy: scanning leaf-first from the validated frame, returns the first frame
/// that belongs to exactly `target` and is not an allocator wrapper.
///
/// The entry-point frame at index 0 is never a candidate.
pub fn forward_first_match<'s, 'a>(
    frames: &'s [Frame<'a>],
    target: &str,
) -> Option<&'s StackFrame<'a>> {
    frames
        .iter()
        .skip(1)
        .filter_map(Frame::parsed)
        .find(|frame| frame.library == target && !is_allocator_wrapper(frame.function))
}

/// The histogram strategy: scanning from the root-ward end of the stack back towards the leaf,
/// returns the first frame whose library contains `target` and that is not an allocator
/// wrapper.
pub fn reverse_last_match<'s, 'a>(
    frames: &'s [Frame<'a>],
    target: &str,
) -> Option<&'s StackFrame<'a>> {
    frames
        .iter()
        .rev()
        .filter_map(Frame::parsed)
        .find(|frame| frame.library.contains(target) && !is_allocator_wrapper(frame.function))
}

/// The histogram fallback: scanning in the same direction as [`reverse_last_match`], returns
/// the first frame that belongs to exactly `loader` and is not the loader's `entry_stub`.
pub fn reverse_loader_match<'s, 'a>(
    frames: &'s [Frame<'a>],
    loader: &str,
    entry_stub: &str,
) -> Option<&'s StackFrame<'a>> {
    frames
        .iter()
        .rev()
        .filter_map(Frame::parsed)
        .find(|frame| frame.library == loader && frame.function != entry_stub)
}
