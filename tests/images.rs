use penumbra::image::encode_png;
use penumbra::{
    Color, Context, ErrorKind, Image, ImageView, PixelFormat, PixelSurface, RasterSurface,
};

fn red_dot_png() -> Vec<u8> {
    let pixels = [255u8, 0, 0, 255, 0, 0, 0, 0, 0, 0, 0, 0, 255, 0, 0, 255];
    encode_png(&ImageView::new(2, 2, PixelFormat::Rgba8, &pixels).unwrap()).unwrap()
}

#[test]
fn decoded_images_draw_scaled() {
    let image = Image::from_bytes(&red_dot_png()).unwrap();
    let mut ctx =
        Context::new(RasterSurface::new(8, 8, 1.0, PixelFormat::Rgba8).unwrap());
    ctx.set_image_smoothing_enabled(false);
    ctx.draw_image(&image, 0.0, 0.0, 8.0, 8.0).unwrap();

    let (top_left, top_right) = ctx
        .surface_mut()
        .with_pixels(|px| {
            let view = px.view();
            (view.rgba_at(1, 1), view.rgba_at(6, 1))
        })
        .unwrap();
    assert_eq!(top_left, [255, 0, 0, 255]);
    assert_eq!(top_right, [0, 0, 0, 0]);
}

#[test]
fn markup_and_garbage_are_typed_failures() {
    let markup = Image::from_bytes(b"  <svg xmlns=\"http://www.w3.org/2000/svg\"/>").unwrap_err();
    assert_eq!(markup.kind(), ErrorKind::UnsupportedImageFormat);

    let garbage = Image::from_bytes(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap_err();
    assert_eq!(garbage.kind(), ErrorKind::UnsupportedImageFormat);

    let mut truncated = red_dot_png();
    truncated.truncate(20);
    let err = Image::from_bytes(&truncated).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DecodeFailure);
}

#[test]
fn callers_can_fall_back_to_the_placeholder() {
    let image = Image::from_bytes(b"not an image").unwrap_or_else(|_| Image::placeholder());
    let mut ctx =
        Context::new(RasterSurface::new(16, 16, 1.0, PixelFormat::Rgba8).unwrap());
    ctx.draw_image(&image, 0.0, 0.0, 16.0, 16.0).unwrap();
}

#[test]
fn surfaces_draw_onto_each_other() {
    let mut painter =
        Context::new(RasterSurface::new(4, 4, 1.0, PixelFormat::Rgba8).unwrap());
    painter.set_fill_style(Color::new(0.0, 1.0, 0.0, 1.0));
    painter.fill_rect(0.0, 0.0, 4.0, 4.0).unwrap();
    let mut source = painter.into_surface();

    let mut ctx =
        Context::new(RasterSurface::new(10, 10, 1.0, PixelFormat::Rgba8).unwrap());
    ctx.draw_surface(&mut source, 3.0, 3.0, 4.0, 4.0).unwrap();

    let px = ctx
        .surface_mut()
        .with_pixels(|px| px.view().rgba_at(5, 5))
        .unwrap();
    assert_eq!(px, [0, 255, 0, 255]);
}

#[test]
fn context_exports_png() {
    let mut ctx =
        Context::new(RasterSurface::new(3, 3, 1.0, PixelFormat::Rgba8).unwrap());
    ctx.fill_rect(0.0, 0.0, 3.0, 3.0).unwrap();
    let png = ctx.to_png().unwrap();
    let decoded = Image::from_bytes(&png).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (3, 3));
    assert_eq!(&decoded.data()[..3], &[0, 0, 0]);
}
