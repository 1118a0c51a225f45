/// True iff both series are defined at both points and `a` moved from at or
/// below `b` to strictly above it.
pub fn crossed_up(
    a_prev: Option<f64>,
    a_now: Option<f64>,
    b_prev: Option<f64>,
    b_now: Option<f64>,
) -> bool {
    match (a_prev, a_now, b_prev, b_now) {
        (Some(ap), Some(an), Some(bp), Some(bn)) => ap <= bp && an > bn,
        _ => false,
    }
}

/// True iff both series are defined at both points and `a` moved from at or
/// above `b` to strictly below it.
pub fn crossed_down(
    a_prev: Option<f64>,
    a_now: Option<f64>,
    b_prev: Option<f64>,
    b_now: Option<f64>,
) -> bool {
    match (a_prev, a_now, b_prev, b_now) {
        (Some(ap), Some(an), Some(bp), Some(bn)) => ap >= bp && an < bn,
        _ => false,
    }
}
