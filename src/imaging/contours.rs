//! External contours of a binary mask.
//!
//! Foreground regions are 8-connected, background regions 4-connected, and
//! everything outside the image counts as background. Only regions that touch
//! the outer background are reported; regions nested inside holes are not.
//! Contour vertices are pixel centres, so a filled `w×h` block encloses an
//! area of `(w-1)·(h-1)`.

/// Neighbour offsets in clockwise order (y grows downwards), starting east.
const NEIGHBORS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// Index of the west neighbour.
const WEST: usize = 4;

/// Ordered border pixels of one region.
pub type Contour = Vec<(i32, i32)>;

/// Read-only view of a row-major binary mask (non-zero = foreground).
#[derive(Debug, Clone, Copy)]
pub struct BinaryMask<'a> {
    width: u32,
    height: u32,
    data: &'a [u8],
}

impl<'a> BinaryMask<'a> {
    /// Returns `None` when `data.len() != width * height`.
    pub fn new(width: u32, height: u32, data: &'a [u8]) -> Option<Self> {
        if data.len() != width as usize * height as usize {
            return None;
        }
        Some(Self { width, height, data })
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            None
        } else {
            Some(y as usize * self.width as usize + x as usize)
        }
    }

    fn is_on(&self, x: i32, y: i32) -> bool {
        self.index(x, y).is_some_and(|i| self.data[i] != 0)
    }
}

/// Trace the outer border of every external foreground region, in raster
/// order of each region's first pixel.
pub fn find_external_contours(mask: &BinaryMask<'_>) -> Vec<Contour> {
    let outside = outside_background(mask);
    let mut visited = vec![false; mask.data.len()];
    let mut contours = Vec::new();
    let mut stack = Vec::new();

    for y in 0..mask.height as i32 {
        for x in 0..mask.width as i32 {
            let Some(idx) = mask.index(x, y) else { continue };
            if mask.data[idx] == 0 || visited[idx] {
                continue;
            }

            // Flood the 8-connected region; note whether it meets the outer background.
            let mut external = false;
            visited[idx] = true;
            stack.push((x, y));
            while let Some((cx, cy)) = stack.pop() {
                for (k, &(dx, dy)) in NEIGHBORS.iter().enumerate() {
                    let (nx, ny) = (cx + dx, cy + dy);
                    match mask.index(nx, ny) {
                        None => {
                            if k % 2 == 0 {
                                external = true;
                            }
                        }
                        Some(n) if mask.data[n] != 0 => {
                            if !visited[n] {
                                visited[n] = true;
                                stack.push((nx, ny));
                            }
                        }
                        Some(n) => {
                            if k % 2 == 0 && outside[n] {
                                external = true;
                            }
                        }
                    }
                }
            }

            if external {
                contours.push(trace_outer_border(mask, (x, y)));
            }
        }
    }

    contours
}

/// Background pixels 4-connected to the image frame.
fn outside_background(mask: &BinaryMask<'_>) -> Vec<bool> {
    let (w, h) = (mask.width as i32, mask.height as i32);
    let mut outside = vec![false; mask.data.len()];
    let mut stack = Vec::new();

    let seed = |x: i32, y: i32, outside: &mut Vec<bool>, stack: &mut Vec<(i32, i32)>| {
        if let Some(i) = mask.index(x, y) {
            if mask.data[i] == 0 && !outside[i] {
                outside[i] = true;
                stack.push((x, y));
            }
        }
    };
    for x in 0..w {
        seed(x, 0, &mut outside, &mut stack);
        seed(x, h - 1, &mut outside, &mut stack);
    }
    for y in 0..h {
        seed(0, y, &mut outside, &mut stack);
        seed(w - 1, y, &mut outside, &mut stack);
    }

    while let Some((x, y)) = stack.pop() {
        for &(dx, dy) in NEIGHBORS.iter().step_by(2) {
            seed(x + dx, y + dy, &mut outside, &mut stack);
        }
    }

    outside
}

/// Moore-neighbour tracing from the raster-first pixel of a region.
///
/// The west neighbour of that pixel is background, which seeds the backtrack.
/// Tracing stops when the walk is back at the start and about to repeat its
/// first move.
fn trace_outer_border(mask: &BinaryMask<'_>, start: (i32, i32)) -> Contour {
    let Some(first_dir) = next_on(mask, start, WEST) else {
        return vec![start];
    };
    let first = step(start, first_dir);

    let limit = 4 * mask.data.len() + 8;
    let mut contour = Vec::new();
    let mut current = start;
    let mut backtrack = WEST;

    while let Some(dir) = next_on(mask, current, backtrack) {
        let next = step(current, dir);
        if current == start && next == first && !contour.is_empty() {
            break;
        }
        contour.push(current);
        if contour.len() > limit {
            tracing::warn!(len = contour.len(), "Contour trace did not close");
            break;
        }
        backtrack = backtrack_after(dir);
        current = next;
    }

    contour
}

/// First foreground neighbour clockwise after `from`.
fn next_on(mask: &BinaryMask<'_>, (x, y): (i32, i32), from: usize) -> Option<usize> {
    (1..=8)
        .map(|k| (from + k) % 8)
        .find(|&d| mask.is_on(x + NEIGHBORS[d].0, y + NEIGHBORS[d].1))
}

fn step((x, y): (i32, i32), dir: usize) -> (i32, i32) {
    (x + NEIGHBORS[dir].0, y + NEIGHBORS[dir].1)
}

/// Direction, seen from the pixel reached via `dir`, of the last background
/// neighbour examined before it.
fn backtrack_after(dir: usize) -> usize {
    let (mx, my) = NEIGHBORS[dir];
    let (px, py) = NEIGHBORS[(dir + 7) % 8];
    let rel = (px - mx, py - my);
    NEIGHBORS
        .iter()
        .position(|&n| n == rel)
        .unwrap_or(WEST)
}

/// Enclosed polygon area (shoelace formula).
pub fn contour_area(contour: &[(i32, i32)]) -> f64 {
    if contour.len() < 3 {
        return 0.0;
    }
    let twice: i64 = contour
        .iter()
        .zip(contour.iter().cycle().skip(1))
        .map(|(&(x0, y0), &(x1, y1))| x0 as i64 * y1 as i64 - x1 as i64 * y0 as i64)
        .sum();
    twice.abs() as f64 / 2.0
}
