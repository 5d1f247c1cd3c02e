//! Integer grid coordinates and rectangles.
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

/// Discrete grid position expressed in tile coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pos {
    pub x: i32,
    pub y: i32,
}

impl Pos {
    pub const ZERO: Self = Self::new(0, 0);
    pub const INVALID: Self = Self::new(-1, -1);

    pub const N: Self = Self::new(0, -1);
    pub const S: Self = Self::new(0, 1);
    pub const E: Self = Self::new(1, 0);
    pub const W: Self = Self::new(-1, 0);
    pub const NE: Self = Self::new(1, -1);
    pub const NW: Self = Self::new(-1, -1);
    pub const SE: Self = Self::new(1, 1);
    pub const SW: Self = Self::new(-1, 1);

    /// Compass order, clockwise from north.
    pub const ALL_DIRS: [Self; 8] = [
        Self::N,
        Self::NE,
        Self::E,
        Self::SE,
        Self::S,
        Self::SW,
        Self::W,
        Self::NW,
    ];
    pub const CARDINAL_DIRS: [Self; 4] = [Self::N, Self::E, Self::S, Self::W];

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub const fn is_valid(self) -> bool {
        self.x >= 0 && self.y >= 0
    }

    pub fn manhattan_dist(self, other: Pos) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    pub fn chebyshev_dist(self, other: Pos) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    pub fn euclidean_dist_sq(self, other: Pos) -> i32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Component-wise sign, turning any offset into a unit step.
    pub fn signum(self) -> Pos {
        Pos::new(self.x.signum(), self.y.signum())
    }

    /// True when `self` lies on a straight or diagonal line from `other`.
    pub fn is_compass_from(self, other: Pos) -> bool {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx == 0 || dy == 0 || dx.abs() == dy.abs()
    }

    pub fn is_adjacent(self, other: Pos) -> bool {
        self.chebyshev_dist(other) == 1
    }

    pub fn neighbours(self) -> impl Iterator<Item = Pos> {
        Self::ALL_DIRS.into_iter().map(move |d| self + d)
    }

    pub fn cardinal_neighbours(self) -> impl Iterator<Item = Pos> {
        Self::CARDINAL_DIRS.into_iter().map(move |d| self + d)
    }

    /// Every tile within `radius` (Chebyshev) of `center`, row-major.
    pub fn burst(center: Pos, radius: i32) -> impl Iterator<Item = Pos> {
        let radius = radius.max(0);
        Rect::new(
            center.x - radius,
            center.y - radius,
            radius * 2 + 1,
            radius * 2 + 1,
        )
        .all()
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

impl Add for Pos {
    type Output = Pos;
    fn add(self, rhs: Pos) -> Pos {
        Pos::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Pos {
    type Output = Pos;
    fn sub(self, rhs: Pos) -> Pos {
        Pos::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<i32> for Pos {
    type Output = Pos;
    fn mul(self, rhs: i32) -> Pos {
        Pos::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Pos {
    type Output = Pos;
    fn neg(self) -> Pos {
        Pos::new(-self.x, -self.y)
    }
}

/// Axis-aligned rectangle; `x`/`y` inclusive, `x + w`/`y + h` exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn from_min_max(min: Pos, max: Pos) -> Self {
        Self::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }

    pub fn min(&self) -> Pos {
        Pos::new(self.x, self.y)
    }

    pub fn max(&self) -> Pos {
        Pos::new(self.x + self.w, self.y + self.h)
    }

    pub fn center(&self) -> Pos {
        Pos::new(self.x + self.w / 2, self.y + self.h / 2)
    }

    pub fn area(&self) -> i32 {
        self.w * self.h
    }

    pub fn contains(&self, p: Pos) -> bool {
        p.x >= self.x && p.x < self.x + self.w && p.y >= self.y && p.y < self.y + self.h
    }

    pub fn contains_rect(&self, r: &Rect) -> bool {
        r.x >= self.x && r.y >= self.y && r.x + r.w <= self.x + self.w && r.y + r.h <= self.y + self.h
    }

    pub fn overlaps(&self, r: &Rect) -> bool {
        self.x < r.x + r.w && self.x + self.w > r.x && self.y < r.y + r.h && self.y + self.h > r.y
    }

    /// All tiles, row-major.
    pub fn all(self) -> impl Iterator<Item = Pos> {
        let Rect { x, y, w, h } = self;
        (y..y + h).flat_map(move |py| (x..x + w).map(move |px| Pos::new(px, py)))
    }

    /// Tiles not on the border.
    pub fn interior(self) -> impl Iterator<Item = Pos> {
        let Rect { x, y, w, h } = self;
        (y + 1..y + h - 1).flat_map(move |py| (x + 1..x + w - 1).map(move |px| Pos::new(px, py)))
    }

    /// Top row, bottom row, then the left and right columns without corners.
    pub fn border(self) -> impl Iterator<Item = Pos> {
        let Rect { x, y, w, h } = self;
        let top = (x..x + w).map(move |px| Pos::new(px, y));
        let bottom = (x..x + w).map(move |px| Pos::new(px, y + h - 1));
        let left = (y + 1..y + h - 1).map(move |py| Pos::new(x, py));
        let right = (y + 1..y + h - 1).map(move |py| Pos::new(x + w - 1, py));
        top.chain(bottom).chain(left).chain(right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distances() {
        let a = Pos::new(1, 1);
        let b = Pos::new(4, 3);
        assert_eq!(a.manhattan_dist(b), 5);
        assert_eq!(a.chebyshev_dist(b), 3);
        assert_eq!(a.euclidean_dist_sq(b), 13);
        assert_eq!((b - a).signum(), Pos::SE);
    }

    #[test]
    fn compass_lines() {
        let o = Pos::ZERO;
        assert!(Pos::new(3, 3).is_compass_from(o));
        assert!(Pos::new(0, -5).is_compass_from(o));
        assert!(!Pos::new(2, 1).is_compass_from(o));
    }

    #[test]
    fn rect_iterators_cover_expected_tiles() {
        let r = Rect::new(0, 0, 4, 3);
        assert_eq!(r.all().count(), 12);
        assert_eq!(r.interior().collect::<Vec<_>>(), vec![Pos::new(1, 1), Pos::new(2, 1)]);
        assert_eq!(r.border().count(), 10);
        assert!(r.contains(Pos::new(3, 2)));
        assert!(!r.contains(r.max()));
    }

    #[test]
    fn iterators_outlive_a_temporary_rect() {
        let row: Vec<_> = Rect::new(2, 7, 3, 1).all().collect();
        assert_eq!(row, vec![Pos::new(2, 7), Pos::new(3, 7), Pos::new(4, 7)]);
        let inner = Rect::from_min_max(Pos::new(0, 0), Pos::new(3, 3)).interior().count();
        assert_eq!(inner, 1);
    }

    #[test]
    fn burst_radius_one_is_three_by_three() {
        let tiles: Vec<_> = Pos::burst(Pos::new(5, 5), 1).collect();
        assert_eq!(tiles.len(), 9);
        assert_eq!(tiles[0], Pos::new(4, 4));
        assert!(tiles.iter().all(|p| p.chebyshev_dist(Pos::new(5, 5)) <= 1));
    }
}
