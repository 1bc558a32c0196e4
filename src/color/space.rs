use serde::{Deserialize, Serialize};

use super::mat_idxs::*;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorSpace {
    /// YUV Rec. ITU-R BT.601-7 625
    #[default]
    BT601,

    /// YUV Rec. ITU-R BT.709-6
    BT709,

    /// YUV Rec. ITU-R BT.2020-2
    BT2020,
}

impl ColorSpace {
    /// Analog YUV to RGB, indexed as `[Y|U|V][R|G|B]`
    pub fn ycbcr_to_rgb_mat(self) -> &'static [[f64; 3]; 3] {
        match self {
            ColorSpace::BT601 => &BT601_YUV_TO_RGB,
            ColorSpace::BT709 => &BT709_YUV_TO_RGB,
            ColorSpace::BT2020 => &BT2020_YUV_TO_RGB,
        }
    }

    /// Analog RGB to YUV, indexed as `[Y|U|V][R|G|B]`
    pub fn rgb_to_ycbcr_mat(self) -> &'static [[f64; 3]; 3] {
        match self {
            ColorSpace::BT601 => &BT601_RGB_TO_YUV,
            ColorSpace::BT709 => &BT709_RGB_TO_YUV,
            ColorSpace::BT2020 => &BT2020_RGB_TO_YUV,
        }
    }

    /// Convert analog RGB (`0.0..=1.0`) to analog YUV (Y `0.0..=1.0`, U & V `-0.5..=0.5`)
    pub fn rgb_to_ycbcr(self, rgb: [f64; 3]) -> [f64; 3] {
        let mat = self.rgb_to_ycbcr_mat();
        let [r, g, b] = rgb;

        [Y, U, V].map(|row| mat[row][R] * r + mat[row][G] * g + mat[row][B] * b)
    }
}

#[rustfmt::skip]
macro_rules! make_matrices {
    ($($yuv_to_rgb:ident, $rgb_to_yuv:ident: $kr:expr, $kb:expr;)*) => {
        $(
        const $yuv_to_rgb: [[f64; 3]; 3] = {
            let kr: f64 = $kr;
            let kb: f64 = $kb;
            let kg = 1.0 - kr - kb;

            [
                // R                 G                                B
                [1.0,                1.0,                             1.0            ], // Y
                [0.0,               -(kb / kg) * (2.0 - 2.0 * kb),   2.0 - 2.0 * kb], // U
                [2.0 - 2.0 * kr,    -(kr / kg) * (2.0 - 2.0 * kr),   0.0           ], // V
            ]
        };

        const $rgb_to_yuv: [[f64; 3]; 3] = {
            let kr: f64 = $kr;
            let kb: f64 = $kb;
            let kg = 1.0 - kr - kb;

            [
                // R                     G                        B
                [kr,                     kg,                      kb                     ], // Y
                [-0.5 * (kr / (1.0 - kb)), -0.5 * (kg / (1.0 - kb)), 0.5                    ], // U
                [0.5,                    -0.5 * (kg / (1.0 - kr)), -0.5 * (kb / (1.0 - kr))], // V
            ]
        };
        )*
    };
}

make_matrices! {
    BT601_YUV_TO_RGB, BT601_RGB_TO_YUV: 0.299, 0.114;
    BT709_YUV_TO_RGB, BT709_RGB_TO_YUV: 0.2126, 0.0722;
    BT2020_YUV_TO_RGB, BT2020_RGB_TO_YUV: 0.2627, 0.0593;
}
