//! Score normalization.
//!
//! Redistributes the 100-point budget over a question set in steps of 5,
//! keeping each question's share as close as possible to its current share.
//! Up to 20 questions each keep at least 5 points; larger sets can only be
//! kept non-negative.
//!
//! All arithmetic is done on integers. A question's weight is
//! `points_i / total`, so comparing weights only needs the numerators.

use std::cmp::Reverse;

use crate::model::{Question, POINT_BUDGET, POINT_STEP};

/// Largest number of questions that can each receive the minimum step.
pub const MAX_QUESTIONS: usize = (POINT_BUDGET / POINT_STEP) as usize;

/// Lowest value a question may end up with in a set of `n` questions.
fn floor_for(n: usize) -> u32 {
    if n > MAX_QUESTIONS {
        0
    } else {
        POINT_STEP
    }
}

/// Compute a normalized points assignment for `questions`.
///
/// The result is positionally aligned with the input. Nothing is modified;
/// the caller decides whether to apply it.
pub fn normalize(questions: &[Question]) -> Vec<u32> {
    let points: Vec<u32> = questions.iter().map(|q| q.points).collect();
    normalize_points(&points)
}

/// Normalize a raw list of point values.
///
/// For any non-empty input the output sums to exactly 100 and every value is
/// a non-negative multiple of 5. With at most 20 inputs every value is also at
/// least 5. An empty input yields an empty output.
pub fn normalize_points(points: &[u32]) -> Vec<u32> {
    let n = points.len();
    match n {
        0 => return Vec::new(),
        1 => return vec![POINT_BUDGET],
        _ => {}
    }
    let floor = floor_for(n);

    let total: u64 = points.iter().map(|&p| u64::from(p)).sum();
    // Weight i is weights[i] / denominator. A zero total means uniform weights.
    let (weights, denominator): (Vec<u64>, u64) = if total == 0 {
        (vec![1; n], n as u64)
    } else {
        (points.iter().map(|&p| u64::from(p)).collect(), total)
    };

    let steps = u64::from(POINT_BUDGET / POINT_STEP);
    let mut assigned: Vec<u32> = weights
        .iter()
        .map(|&w| {
            // round(w / denominator * 100 / 5), halves rounded up
            let units = (2 * w * steps + denominator) / (2 * denominator);
            units as u32 * POINT_STEP
        })
        .collect();

    let mut heaviest_first: Vec<usize> = (0..n).collect();
    heaviest_first.sort_by_key(|&i| Reverse(weights[i]));
    let mut lightest_first: Vec<usize> = (0..n).collect();
    lightest_first.sort_by_key(|&i| weights[i]);

    settle(&mut assigned, &heaviest_first, &lightest_first, floor);

    for value in assigned.iter_mut() {
        if *value < floor {
            *value = floor;
        }
    }

    // Raising values to the minimum can only push the sum over budget; take
    // the excess back from questions that can spare it.
    settle(&mut assigned, &heaviest_first, &lightest_first, floor);

    assigned
}

/// Move `assigned` onto the budget: surplus steps go to the heaviest
/// questions, deficits come out of the lightest ones still above `floor`.
fn settle(
    assigned: &mut [u32],
    heaviest_first: &[usize],
    lightest_first: &[usize],
    floor: u32,
) {
    let sum: u32 = assigned.iter().sum();
    if sum < POINT_BUDGET {
        let steps = (POINT_BUDGET - sum) / POINT_STEP;
        for &i in heaviest_first.iter().cycle().take(steps as usize) {
            assigned[i] += POINT_STEP;
        }
    } else if sum > POINT_BUDGET {
        withdraw(assigned, lightest_first, (sum - POINT_BUDGET) / POINT_STEP, floor);
    }
}

fn withdraw(assigned: &mut [u32], order: &[usize], mut steps: u32, floor: u32) {
    let mut cursor = 0usize;
    // Consecutive visits that found nothing to take; a full lap means stop.
    let mut idle = 0usize;
    while steps > 0 && idle < order.len() {
        let i = order[cursor % order.len()];
        cursor += 1;
        if assigned[i] > floor {
            assigned[i] -= POINT_STEP;
            steps -= 1;
            idle = 0;
        } else {
            idle += 1;
        }
    }
}
