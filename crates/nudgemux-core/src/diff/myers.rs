//! Myers diff over byte slices.

/// A single edit-script operation.
///
/// Applying the sequence to the source yields the target: Equal and
/// Delete regions partition the source, Equal and Insert regions
/// partition the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffOp {
    Equal(Vec<u8>),
    Delete(Vec<u8>),
    Insert(Vec<u8>),
}

impl DiffOp {
    pub fn data(&self) -> &[u8] {
        match self {
            DiffOp::Equal(d) | DiffOp::Delete(d) | DiffOp::Insert(d) => d,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Equal,
    Delete,
    Insert,
}

fn op_from(kind: Kind, data: Vec<u8>) -> DiffOp {
    match kind {
        Kind::Equal => DiffOp::Equal(data),
        Kind::Delete => DiffOp::Delete(data),
        Kind::Insert => DiffOp::Insert(data),
    }
}

/// Compute the shortest edit script transforming `a` into `b`.
///
/// The common prefix and suffix are stripped before the core algorithm
/// runs and re-emitted as bracketing Equal operations, so the typical
/// case (a tiny change in a large capture) stays near-linear. The middle
/// is processed by the O((N+M)*D) greedy algorithm with a trace for
/// backtracking; consecutive operations of the same kind are merged.
pub fn myers_diff(a: &[u8], b: &[u8]) -> Vec<DiffOp> {
    if a.is_empty() && b.is_empty() {
        return Vec::new();
    }
    if a.is_empty() {
        return vec![DiffOp::Insert(b.to_vec())];
    }
    if b.is_empty() {
        return vec![DiffOp::Delete(a.to_vec())];
    }
    if a == b {
        return vec![DiffOp::Equal(a.to_vec())];
    }

    let prefix_len = common_prefix_len(a, b);
    let (prefix, a) = a.split_at(prefix_len);
    let b = &b[prefix_len..];

    let suffix_len = common_suffix_len(a, b);
    let (a, suffix) = a.split_at(a.len() - suffix_len);
    let b = &b[..b.len() - suffix_len];

    let middle = if a.is_empty() && b.is_empty() {
        Vec::new()
    } else if a.is_empty() {
        vec![DiffOp::Insert(b.to_vec())]
    } else if b.is_empty() {
        vec![DiffOp::Delete(a.to_vec())]
    } else {
        shortest_edit(a, b)
    };

    let mut result = Vec::with_capacity(middle.len() + 2);
    if !prefix.is_empty() {
        result.push(DiffOp::Equal(prefix.to_vec()));
    }
    result.extend(middle);
    if !suffix.is_empty() {
        result.push(DiffOp::Equal(suffix.to_vec()));
    }
    result
}

fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

fn common_suffix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().rev().zip(b.iter().rev()).take_while(|(x, y)| x == y).count()
}

/// Core greedy search. Assumes `a` and `b` are non-empty with no common
/// prefix or suffix.
fn shortest_edit(a: &[u8], b: &[u8]) -> Vec<DiffOp> {
    let n = a.len() as isize;
    let m = b.len() as isize;
    let max = n + m;

    // v[(k + max) as usize] holds the furthest-reaching x on diagonal k
    let mut v = vec![0isize; 2 * max as usize + 1];
    let mut trace: Vec<Vec<isize>> = Vec::new();

    for d in 0..=max {
        trace.push(v.clone());

        let mut k = -d;
        while k <= d {
            let mut x = if k == -d || (k != d && v[(k - 1 + max) as usize] < v[(k + 1 + max) as usize]) {
                // Move down (insert from b)
                v[(k + 1 + max) as usize]
            } else {
                // Move right (delete from a)
                v[(k - 1 + max) as usize] + 1
            };
            let mut y = x - k;

            // Follow the diagonal through matches
            while x < n && y < m && a[x as usize] == b[y as usize] {
                x += 1;
                y += 1;
            }

            v[(k + max) as usize] = x;

            if x >= n && y >= m {
                return backtrack(&trace, a, b, d);
            }

            k += 2;
        }
    }

    unreachable!("edit distance is bounded by n + m")
}

/// Reconstruct the edit script from the trace.
fn backtrack(trace: &[Vec<isize>], a: &[u8], b: &[u8], d_final: isize) -> Vec<DiffOp> {
    let n = a.len() as isize;
    let m = b.len() as isize;
    let max = n + m;
    let (mut x, mut y) = (n, m);

    // Collected in reverse as (kind, byte) pairs, reversed before merging.
    let mut ops: Vec<(Kind, u8)> = Vec::new();

    let mut d = d_final;
    while d > 0 {
        let v = &trace[d as usize];
        let k = x - y;

        let prev_k = if k == -d || (k != d && v[(k - 1 + max) as usize] < v[(k + 1 + max) as usize]) {
            k + 1 // came from an insert
        } else {
            k - 1 // came from a delete
        };
        let prev_x = v[(prev_k + max) as usize];
        let prev_y = prev_x - prev_k;

        while x > prev_x && y > prev_y {
            x -= 1;
            y -= 1;
            ops.push((Kind::Equal, a[x as usize]));
        }

        if k == prev_k + 1 {
            x -= 1;
            ops.push((Kind::Delete, a[x as usize]));
        } else {
            y -= 1;
            ops.push((Kind::Insert, b[y as usize]));
        }

        d -= 1;
    }

    // Remaining matches and edits before the first divergence
    while x > 0 && y > 0 {
        x -= 1;
        y -= 1;
        ops.push((Kind::Equal, a[x as usize]));
    }
    while x > 0 {
        x -= 1;
        ops.push((Kind::Delete, a[x as usize]));
    }
    while y > 0 {
        y -= 1;
        ops.push((Kind::Insert, b[y as usize]));
    }

    ops.reverse();
    merge_ops(ops)
}

/// Merge consecutive single-byte operations of the same kind.
fn merge_ops(raw: Vec<(Kind, u8)>) -> Vec<DiffOp> {
    let mut result = Vec::new();
    let mut iter = raw.into_iter();
    let Some((mut kind, first)) = iter.next() else {
        return result;
    };
    let mut data = vec![first];

    for (k, byte) in iter {
        if k == kind {
            data.push(byte);
        } else {
            result.push(op_from(kind, std::mem::take(&mut data)));
            kind = k;
            data.push(byte);
        }
    }
    result.push(op_from(kind, data));
    result
}
