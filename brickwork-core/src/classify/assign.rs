use crate::{config::ClassifierConfig, entities::BBox};

/// Cost standing in for "never pair these two".
pub const PROHIBITIVE_COST: f64 = 1e9;

/// Dense row-major cost matrix. Non-finite costs are stored as [`PROHIBITIVE_COST`].
#[derive(Debug, Clone, PartialEq)]
pub struct CostMatrix {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl CostMatrix {
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> f64) -> Self {
        let mut values = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                let cost = f(r, c);
                values.push(if cost.is_finite() {
                    cost
                } else {
                    PROHIBITIVE_COST
                });
            }
        }
        Self { rows, cols, values }
    }

    #[inline(always)]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.cols + col]
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    fn transpose(&self) -> Self {
        Self::from_fn(self.cols, self.rows, |r, c| self.get(c, r))
    }
}

/// Minimum-cost matching (Hungarian algorithm with potentials, O(n²m)). Every row of the
/// smaller side is matched. Returns the matched column for each row.
pub fn hungarian(costs: &CostMatrix) -> Vec<Option<usize>> {
    if costs.is_empty() {
        return vec![None; costs.rows];
    }
    if costs.rows > costs.cols {
        let mut matching = vec![None; costs.rows];
        for (col, row) in hungarian(&costs.transpose()).into_iter().enumerate() {
            if let Some(row) = row {
                matching[row] = Some(col);
            }
        }
        return matching;
    }

    let (n, m) = (costs.rows, costs.cols);
    // 1-based; column 0 is the virtual start
    let mut u = vec![0f64; n + 1];
    let mut v = vec![0f64; m + 1];
    let mut owner = vec![0usize; m + 1];
    let mut way = vec![0usize; m + 1];

    for row in 1..=n {
        owner[0] = row;
        let mut col0 = 0;
        let mut min_slack = vec![f64::INFINITY; m + 1];
        let mut used = vec![false; m + 1];
        loop {
            used[col0] = true;
            let row0 = owner[col0];
            let mut delta = f64::INFINITY;
            let mut col1 = 0;
            for col in 1..=m {
                if used[col] {
                    continue;
                }
                let slack = costs.get(row0 - 1, col - 1) - u[row0] - v[col];
                if slack < min_slack[col] {
                    min_slack[col] = slack;
                    way[col] = col0;
                }
                if min_slack[col] < delta {
                    delta = min_slack[col];
                    col1 = col;
                }
            }
            if col1 == 0 {
                break;
            }
            for col in 0..=m {
                if used[col] {
                    u[owner[col]] += delta;
                    v[col] -= delta;
                } else {
                    min_slack[col] -= delta;
                }
            }
            col0 = col1;
            if owner[col0] == 0 {
                break;
            }
        }
        while col0 != 0 {
            let prev = way[col0];
            owner[col0] = owner[prev];
            col0 = prev;
        }
    }

    let mut matching = vec![None; n];
    for col in 1..=m {
        if owner[col] != 0 {
            matching[owner[col] - 1] = Some(col - 1);
        }
    }
    matching
}

/// Optimal one-to-one pairs `(row, col)` whose cost does not exceed `max_cost`, by row.
pub fn assign_one_to_one(costs: &CostMatrix, max_cost: f64) -> Vec<(usize, usize)> {
    let clamped = CostMatrix::from_fn(costs.rows, costs.cols, |r, c| {
        let cost = costs.get(r, c);
        if cost > max_cost {
            PROHIBITIVE_COST
        } else {
            cost
        }
    });
    hungarian(&clamped)
        .into_iter()
        .enumerate()
        .filter_map(|(row, col)| col.map(|col| (row, col)))
        .filter(|&(row, col)| costs.get(row, col) <= max_cost)
        .collect()
}

/// Every row goes to at most one column, columns may take several rows. The optimal
/// one-to-one matching is computed first; rows left over join their cheapest column
/// within `max_cost` (lowest column on ties).
pub fn assign_one_to_many(costs: &CostMatrix, max_cost: f64) -> Vec<(usize, usize)> {
    let mut pairs = assign_one_to_one(costs, max_cost);
    let mut matched = vec![false; costs.rows];
    for &(row, _) in &pairs {
        matched[row] = true;
    }
    for row in (0..costs.rows).filter(|r| !matched[*r]) {
        let best = (0..costs.cols)
            .map(|col| (col, costs.get(row, col)))
            .filter(|(_, cost)| *cost <= max_cost)
            .min_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        if let Some((col, _)) = best {
            pairs.push((row, col));
        }
    }
    pairs.sort_unstable();
    pairs
}

/// Cost of attaching `target` to the step laid out at `anchor`: the distance between
/// their centers, plus a penalty when the target sits above the anchor. Prohibitive when
/// one of the `obstacles` crosses the line between the two centers.
pub fn placement_cost(
    anchor: &BBox,
    target: &BBox,
    obstacles: &[BBox],
    config: &ClassifierConfig,
) -> f64 {
    let (from, to) = (anchor.center(), target.center());
    if obstacles.iter().any(|o| o.intersects_segment(from, to)) {
        return PROHIBITIVE_COST;
    }
    let mut cost = anchor.center_distance(target);
    if to.1 < anchor.y0 {
        cost += config.assignment_wrong_side_penalty;
    }
    cost
}
