// src/selection/pso/pareto.rs
//! Non-dominated sorting and crowding distance over two maximized objectives
//!
//! Objective 0 is scaled accuracy, objective 1 is scaled (negated) energy,
//! so larger is better in both.

use std::cmp::Ordering;

/// Anything that sits at a point in two-objective space
pub trait Objectives {
    fn objectives(&self) -> [f64; 2];
}

impl Objectives for [f64; 2] {
    fn objectives(&self) -> [f64; 2] {
        *self
    }
}

/// `a` is at least as good as `b` everywhere and strictly better somewhere
pub fn dominates(a: [f64; 2], b: [f64; 2]) -> bool {
    let no_worse = a[0] >= b[0] && a[1] >= b[1];
    let better = a[0] > b[0] || a[1] > b[1];
    no_worse && better
}

fn descending(a: [f64; 2], b: [f64; 2]) -> Ordering {
    b[0].total_cmp(&a[0]).then(b[1].total_cmp(&a[1]))
}

/// Split a population into its first front and the rest.
///
/// After sorting by objectives descending, a candidate joins the front
/// unless an earlier member is at least as good on objective 1; objective
/// 0 is already no worse for every earlier member. Exact duplicates of a
/// front member go to the rest. The front comes out in descending order.
pub fn nondominated_sort<T: Objectives>(mut population: Vec<T>) -> (Vec<T>, Vec<T>) {
    population.sort_by(|a, b| descending(a.objectives(), b.objectives()));

    let mut front: Vec<T> = Vec::new();
    let mut rest: Vec<T> = Vec::new();
    // Best objective 1 seen in the front so far
    let mut best_second = f64::NEG_INFINITY;

    for candidate in population {
        let second = candidate.objectives()[1];
        if front.is_empty() || second > best_second {
            best_second = best_second.max(second);
            front.push(candidate);
        } else {
            rest.push(candidate);
        }
    }

    (front, rest)
}

/// Every front of a population, best first
pub fn fronts<T: Objectives>(population: Vec<T>) -> Vec<Vec<T>> {
    let mut fronts = Vec::new();
    let mut rest = population;
    while !rest.is_empty() {
        let (front, remainder) = nondominated_sort(rest);
        fronts.push(front);
        rest = remainder;
    }
    fronts
}

/// Crowding distance of each member, summed over both objectives.
/// Boundary members of each objective get infinity.
pub fn crowding_distances<T: Objectives>(front: &[T]) -> Vec<f64> {
    let n = front.len();
    let mut distances = vec![0.0; n];
    if n <= 2 {
        return vec![f64::INFINITY; n];
    }

    for dimension in 0..2 {
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            front[a].objectives()[dimension].total_cmp(&front[b].objectives()[dimension])
        });

        distances[order[0]] = f64::INFINITY;
        distances[order[n - 1]] = f64::INFINITY;
        for k in 1..n - 1 {
            let lower = front[order[k - 1]].objectives()[dimension];
            let upper = front[order[k + 1]].objectives()[dimension];
            distances[order[k]] += upper - lower;
        }
    }

    distances
}

/// Least crowded first; equal distances keep their order
pub fn crowding_sort<T: Objectives>(front: Vec<T>) -> Vec<T> {
    let distances = crowding_distances(&front);
    let mut ranked: Vec<(f64, T)> = distances.into_iter().zip(front).collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
    ranked.into_iter().map(|(_, member)| member).collect()
}

/// Fill up to `capacity` members front by front; the front that does not
/// fit whole is cut by crowding distance
pub fn truncate<T: Objectives>(population: Vec<T>, capacity: usize) -> Vec<T> {
    let mut next = Vec::with_capacity(capacity);
    let mut rest = population;

    while next.len() < capacity && !rest.is_empty() {
        let (front, remainder) = nondominated_sort(rest);
        if next.len() + front.len() <= capacity {
            next.extend(front);
        } else {
            let room = capacity - next.len();
            next.extend(crowding_sort(front).into_iter().take(room));
            break;
        }
        rest = remainder;
    }

    next
}
