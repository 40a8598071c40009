//! Region overlays for display

use camera_capture::VideoFrame;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::region::Region;

pub const FACE_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
pub const EYE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

const LINE_WIDTH: u32 = 2;

/// Copy of `frame` with faces outlined in blue and eyes in green.
/// Eye regions must already be in frame coordinates.
pub fn annotate(frame: &VideoFrame, faces: &[Region], eyes: &[Region]) -> VideoFrame {
    let Some(mut canvas) = frame.to_rgb_image() else {
        return frame.clone();
    };

    for face in faces {
        outline(&mut canvas, face, FACE_COLOR);
    }
    for eye in eyes {
        outline(&mut canvas, eye, EYE_COLOR);
    }

    VideoFrame::from_rgb_image(canvas, frame.timestamp_ns, frame.sequence)
}

fn outline(canvas: &mut RgbImage, region: &Region, color: Rgb<u8>) {
    let (width, height) = canvas.dimensions();
    let region = region.clamp_to(width, height);

    for inset in 0..LINE_WIDTH {
        if region.width <= 2 * inset || region.height <= 2 * inset {
            break;
        }
        let rect = Rect::at((region.x + inset) as i32, (region.y + inset) as i32)
            .of_size(region.width - 2 * inset, region.height - 2 * inset);
        draw_hollow_rect_mut(canvas, rect, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank(width: u32, height: u32) -> VideoFrame {
        VideoFrame::new(vec![0; (width * height * 3) as usize], width, height, 5, 9)
    }

    #[test]
    fn test_outlines_regions() {
        let frame = blank(20, 20);
        let annotated = annotate(&frame, &[Region::new(2, 2, 10, 10)], &[Region::new(4, 4, 4, 3)]);

        assert_eq!(annotated.get_pixel(2, 2), Some([0, 0, 255]));
        assert_eq!(annotated.get_pixel(3, 3), Some([0, 0, 255]));
        assert_eq!(annotated.get_pixel(11, 11), Some([0, 0, 255]));
        assert_eq!(annotated.get_pixel(4, 4), Some([0, 255, 0]));
        // Interior untouched
        assert_eq!(annotated.get_pixel(8, 9), Some([0, 0, 0]));
        assert_eq!(annotated.sequence, 9);
        assert_eq!(annotated.timestamp_ns, 5);

        // Source frame is not modified
        assert_eq!(frame.get_pixel(2, 2), Some([0, 0, 0]));
    }

    #[test]
    fn test_degenerate_regions_are_skipped() {
        let frame = blank(10, 10);
        let annotated = annotate(
            &frame,
            &[Region::new(3, 3, 0, 5), Region::new(50, 50, 5, 5)],
            &[],
        );
        assert_eq!(annotated.data, frame.data);
    }
}
