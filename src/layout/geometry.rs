//! Rectangles in human and page coordinates.
//!
//! Human coordinates put the origin at the top-left corner of the page
//! with y growing downward. Page coordinates are PDF default user space:
//! origin bottom-left, y growing upward.

/// A rectangle in human coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    /// X coordinate of the left edge
    pub x: f64,
    /// Y coordinate of the top edge, measured down from the page top
    pub y: f64,
    /// Width of rectangle
    pub width: f64,
    /// Height of rectangle
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle from position and dimensions.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_certifier::layout::Rect;
    ///
    /// let rect = Rect::new(25.0, 698.0, 120.0, 20.0);
    /// assert_eq!(rect.right(), 145.0);
    /// assert_eq!(rect.bottom(), 718.0);
    /// ```
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Get the right edge x-coordinate.
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Get the bottom edge y-coordinate.
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Convert to page coordinates on a page `page_height` units tall.
    ///
    /// ```
    /// use pdf_certifier::layout::Rect;
    ///
    /// let page = Rect::new(25.0, 698.0, 120.0, 20.0).to_page_rect(792.0);
    /// assert_eq!((page.lower_left_y, page.upper_right_y), (74.0, 94.0));
    /// ```
    pub fn to_page_rect(&self, page_height: f64) -> PageRect {
        PageRect {
            lower_left_x: self.x,
            lower_left_y: page_height - self.y - self.height,
            upper_right_x: self.x + self.width,
            upper_right_y: page_height - self.y,
        }
    }
}

/// A rectangle in page coordinates, stored as its two corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRect {
    /// Left edge
    pub lower_left_x: f64,
    /// Bottom edge
    pub lower_left_y: f64,
    /// Right edge
    pub upper_right_x: f64,
    /// Top edge
    pub upper_right_y: f64,
}

impl PageRect {
    /// Width of the rectangle.
    pub fn width(&self) -> f64 {
        self.upper_right_x - self.lower_left_x
    }

    /// Height of the rectangle.
    pub fn height(&self) -> f64 {
        self.upper_right_y - self.lower_left_y
    }

    /// `[llx lly urx ury]`, the order of a PDF rectangle array.
    pub fn to_array(&self) -> [f64; 4] {
        [self.lower_left_x, self.lower_left_y, self.upper_right_x, self.upper_right_y]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_edges() {
        let r = Rect::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(r.right(), 110.0);
        assert_eq!(r.bottom(), 70.0);
    }

    #[test]
    fn test_to_page_rect_letter() {
        let page = Rect::new(25.0, 698.0, 120.0, 20.0).to_page_rect(792.0);
        assert_eq!(page.lower_left_x, 25.0);
        assert_eq!(page.lower_left_y, 74.0);
        assert_eq!(page.upper_right_x, 145.0);
        assert_eq!(page.upper_right_y, 94.0);
        assert_eq!(page.width(), 120.0);
        assert_eq!(page.height(), 20.0);
    }

    #[test]
    fn test_to_page_rect_top_left_corner() {
        let page = Rect::new(0.0, 0.0, 50.0, 10.0).to_page_rect(842.0);
        assert_eq!(page.to_array(), [0.0, 832.0, 50.0, 842.0]);
    }
}
