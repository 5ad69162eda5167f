//! Progress and frame index math.

/// Frame index for a normalized progress: `floor(progress * total)` clamped to
/// `[0, total]`. Progress 1.0 maps to `total`, not `total - 1`.
pub fn frame_index(progress: f64, total_frames: u64) -> u64 {
    if total_frames == 0 || !(progress > 0.0) {
        return 0;
    }
    let raw = (progress * total_frames as f64).floor();
    if raw >= total_frames as f64 {
        total_frames
    } else {
        raw as u64
    }
}

/// Normalized progress for a frame reported by a frame-based player.
pub fn progress_for_frame(frame: u64, total_frames: u64) -> f64 {
    if total_frames == 0 {
        return 0.0;
    }
    frame.min(total_frames) as f64 / total_frames as f64
}

/// Wrap into [0, 1). Non-finite input maps to 0.
pub fn wrap_progress(progress: f64) -> f64 {
    if !progress.is_finite() {
        return 0.0;
    }
    let w = progress.rem_euclid(1.0);
    // rem_euclid can round up to exactly 1.0 for tiny negative inputs
    if w >= 1.0 {
        0.0
    } else {
        w
    }
}

/// Clamp into [0, 1]. NaN maps to 0.
pub fn clamp_progress(progress: f64) -> f64 {
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_index_endpoints() {
        assert_eq!(frame_index(0.0, 174), 0);
        assert_eq!(frame_index(1.0, 174), 174);
        assert_eq!(frame_index(0.5, 174), 87);
    }

    #[test]
    fn frame_index_clamps_out_of_range() {
        assert_eq!(frame_index(-0.25, 10), 0);
        assert_eq!(frame_index(3.0, 10), 10);
        assert_eq!(frame_index(f64::NAN, 10), 0);
        assert_eq!(frame_index(0.7, 0), 0);
    }

    #[test]
    fn frame_index_floors() {
        assert_eq!(frame_index(0.999, 10), 9);
        assert_eq!(frame_index(0.1, 3), 0);
    }

    #[test]
    fn progress_for_frame_inverts_at_frame_boundaries() {
        assert_eq!(progress_for_frame(0, 10), 0.0);
        assert_eq!(progress_for_frame(5, 10), 0.5);
        assert_eq!(progress_for_frame(20, 10), 1.0);
        assert_eq!(progress_for_frame(3, 0), 0.0);
    }

    #[test]
    fn wrap_stays_in_half_open_range() {
        assert_eq!(wrap_progress(1.0), 0.0);
        assert!((wrap_progress(1.25) - 0.25).abs() < 1e-12);
        assert!((wrap_progress(-0.25) - 0.75).abs() < 1e-12);
        assert_eq!(wrap_progress(f64::INFINITY), 0.0);
        let tiny = wrap_progress(-1e-20);
        assert!((0.0..1.0).contains(&tiny));
    }

    #[test]
    fn clamp_handles_nan() {
        assert_eq!(clamp_progress(f64::NAN), 0.0);
        assert_eq!(clamp_progress(2.0), 1.0);
        assert_eq!(clamp_progress(-1.0), 0.0);
    }
}
