//! 正準ランドマークスキームと1フレーム分のポーズ表現

/// 正準スキーム（33ランドマーク）のインデックス
///
/// 上半身の主要関節だけでなく顔・手指・足先も含む。バー追跡で実際に
/// 参照するのは肩・肘・手首だが、上流サービスの出力をそのまま保持する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum LandmarkIndex {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl LandmarkIndex {
    pub const COUNT: usize = 33;

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Nose),
            1 => Some(Self::LeftEyeInner),
            2 => Some(Self::LeftEye),
            3 => Some(Self::LeftEyeOuter),
            4 => Some(Self::RightEyeInner),
            5 => Some(Self::RightEye),
            6 => Some(Self::RightEyeOuter),
            7 => Some(Self::LeftEar),
            8 => Some(Self::RightEar),
            9 => Some(Self::MouthLeft),
            10 => Some(Self::MouthRight),
            11 => Some(Self::LeftShoulder),
            12 => Some(Self::RightShoulder),
            13 => Some(Self::LeftElbow),
            14 => Some(Self::RightElbow),
            15 => Some(Self::LeftWrist),
            16 => Some(Self::RightWrist),
            17 => Some(Self::LeftPinky),
            18 => Some(Self::RightPinky),
            19 => Some(Self::LeftIndex),
            20 => Some(Self::RightIndex),
            21 => Some(Self::LeftThumb),
            22 => Some(Self::RightThumb),
            23 => Some(Self::LeftHip),
            24 => Some(Self::RightHip),
            25 => Some(Self::LeftKnee),
            26 => Some(Self::RightKnee),
            27 => Some(Self::LeftAnkle),
            28 => Some(Self::RightAnkle),
            29 => Some(Self::LeftHeel),
            30 => Some(Self::RightHeel),
            31 => Some(Self::LeftFootIndex),
            32 => Some(Self::RightFootIndex),
            _ => None,
        }
    }
}

/// 検出された1個のランドマーク
#[derive(Debug, Clone, Copy)]
pub struct Landmark {
    /// 正規化されたX座標 (0.0〜1.0)
    pub x: f32,
    /// 正規化されたY座標 (0.0〜1.0)
    pub y: f32,
    /// 奥行き。バックエンドによっては常に0
    pub z: f32,
    /// 可視性 (0.0〜1.0)
    pub visibility: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, visibility: f32) -> Self {
        Self {
            x,
            y,
            z: 0.0,
            visibility,
        }
    }

    /// 可視性が閾値以上か
    pub fn is_valid(&self, threshold: f32) -> bool {
        self.visibility >= threshold
    }

    /// ピクセル座標に変換
    pub fn to_pixel(&self, width: u32, height: u32) -> (f32, f32) {
        (self.x * width as f32, self.y * height as f32)
    }
}

impl Default for Landmark {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            visibility: 0.0,
        }
    }
}

/// 1フレーム分の正準ポーズ
#[derive(Debug, Clone)]
pub struct FramePose {
    /// フレーム番号（ビデオ内で厳密単調増加）
    pub frame: u32,
    /// フレームの時刻（秒）
    pub timestamp: f32,
    pub landmarks: [Landmark; LandmarkIndex::COUNT],
}

impl FramePose {
    pub fn new(frame: u32, timestamp: f32, landmarks: [Landmark; LandmarkIndex::COUNT]) -> Self {
        Self {
            frame,
            timestamp,
            landmarks,
        }
    }

    pub fn get(&self, index: LandmarkIndex) -> &Landmark {
        &self.landmarks[index as usize]
    }

    /// 全ランドマークの平均可視性
    pub fn average_visibility(&self) -> f32 {
        let sum: f32 = self.landmarks.iter().map(|lm| lm.visibility).sum();
        sum / LandmarkIndex::COUNT as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_index_roundtrip() {
        for i in 0..LandmarkIndex::COUNT {
            let index = LandmarkIndex::from_index(i).unwrap();
            assert_eq!(index as usize, i);
        }
        assert!(LandmarkIndex::from_index(LandmarkIndex::COUNT).is_none());
    }

    #[test]
    fn test_upper_body_indices() {
        assert_eq!(LandmarkIndex::LeftShoulder as usize, 11);
        assert_eq!(LandmarkIndex::RightShoulder as usize, 12);
        assert_eq!(LandmarkIndex::LeftElbow as usize, 13);
        assert_eq!(LandmarkIndex::RightElbow as usize, 14);
        assert_eq!(LandmarkIndex::LeftWrist as usize, 15);
        assert_eq!(LandmarkIndex::RightWrist as usize, 16);
    }

    #[test]
    fn test_is_valid() {
        let lm = Landmark::new(0.5, 0.5, 0.4);
        assert!(lm.is_valid(0.3));
        assert!(lm.is_valid(0.4));
        assert!(!lm.is_valid(0.5));
    }

    #[test]
    fn test_to_pixel() {
        let lm = Landmark::new(0.5, 0.25, 0.9);
        let (px, py) = lm.to_pixel(1920, 1080);
        assert_eq!(px, 960.0);
        assert_eq!(py, 270.0);
    }

    #[test]
    fn test_pose_get_and_average_visibility() {
        let mut landmarks = [Landmark::default(); LandmarkIndex::COUNT];
        landmarks[LandmarkIndex::LeftWrist as usize] = Landmark::new(0.3, 0.6, 1.0);
        let pose = FramePose::new(7, 0.2333, landmarks);

        assert_eq!(pose.get(LandmarkIndex::LeftWrist).x, 0.3);
        assert_eq!(pose.frame, 7);

        let expected = 1.0 / LandmarkIndex::COUNT as f32;
        assert!((pose.average_visibility() - expected).abs() < 1e-6);
    }
}
