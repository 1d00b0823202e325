//! # QRコード描画
//!
//! ディープリンクをPNGのQRコードにし、`data:` URLとして返す。
//! 誤り訂正レベル・余白・拡大率は固定。

use std::io::Cursor;

use base64::Engine;
use image::{ImageBuffer, ImageFormat, Luma};
use qrcode::{Color, EcLevel, QrCode};

use crate::error::GatewayError;

/// 誤り訂正レベル
pub const QR_EC_LEVEL: EcLevel = EcLevel::L;
/// 余白（モジュール数）
pub const QR_MARGIN: u32 = 2;
/// 1モジュールあたりのピクセル数
pub const QR_SCALE: u32 = 4;

const DARK: Luma<u8> = Luma([0]);
const LIGHT: Luma<u8> = Luma([255]);

/// 文字列をQRコードのPNG `data:` URLにする。
///
/// QRコードに収まらない長さのデータはエラー。
pub fn render_data_url(data: &str) -> Result<String, GatewayError> {
    let png = render_png(data)?;
    Ok(format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png)
    ))
}

/// 文字列をQRコードのPNGにする。
pub fn render_png(data: &str) -> Result<Vec<u8>, GatewayError> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), QR_EC_LEVEL)
        .map_err(|e| GatewayError::Internal(format!("QRコードの生成に失敗: {e}")))?;

    let width = code.width() as u32;
    let colors = code.to_colors();
    let side = (width + 2 * QR_MARGIN) * QR_SCALE;

    let image = ImageBuffer::from_fn(side, side, |x, y| {
        let (mx, my) = (x / QR_SCALE, y / QR_SCALE);
        if mx < QR_MARGIN || my < QR_MARGIN {
            return LIGHT;
        }
        let (mx, my) = (mx - QR_MARGIN, my - QR_MARGIN);
        if mx >= width || my >= width {
            return LIGHT;
        }
        match colors[(my * width + mx) as usize] {
            Color::Dark => DARK,
            Color::Light => LIGHT,
        }
    });

    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| GatewayError::Internal(format!("PNGのエンコードに失敗: {e}")))?;
    Ok(png)
}
