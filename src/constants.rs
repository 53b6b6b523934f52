/// 表情分类模型的输入边长（48×48 灰度图）
pub const FACE_INPUT_SIZE: u32 = 48;

/// 标题栏高度（像素）
pub const TITLE_BAR_HEIGHT: u32 = 50;

/// multipart 视频流的分隔符
pub const FRAME_BOUNDARY: &str = "frame";

/// 确认事件的时间戳格式（本地时间）
pub const EVENT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 情绪分析固定标签，顺序与模型输出一致
pub const SENTIMENT_CLASSES: &[&str] = &["Negative", "Neutral", "Positive"];

/// 情绪历史默认返回条数
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// 情绪历史最大返回条数
pub const MAX_HISTORY_LIMIT: usize = 200;

pub const NO_MEDICINE_MESSAGE: &str =
    "I couldn't find a recommended medicine. Please consult a doctor.";

pub const NO_CONDITION_MESSAGE: &str =
    "I couldn't determine your condition. Please consult a doctor.";

pub const EMPTY_TEXT_MESSAGE: &str = "Please enter some text.";

pub const EMPTY_CONDITION_MESSAGE: &str = "Please enter a condition.";

pub const EMPTY_SYMPTOMS_MESSAGE: &str = "Please describe your symptoms.";

pub const EMPTY_MESSAGE_MESSAGE: &str = "Please enter a message.";
