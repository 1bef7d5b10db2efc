//! Fortune records and the draw itself.
//!
//! A draw is: fetch one cat picture, pick one bundled fortune uniformly at
//! random, stamp it with today's date, persist it. Nothing is written unless
//! every step succeeded.

use serde::{Deserialize, Serialize};

use crate::api::ImageSource;
use crate::error::FortuneError;
use crate::store::{Calendar, FortuneStore, KeyValueStore};

/// Highest star rating a fortune can carry.
pub const MAX_STARS: u8 = 5;

// -----------------------------------------------------------------------------
// Bundled fortunes: (stars 0..=5, message)
// -----------------------------------------------------------------------------

pub const FORTUNES: &[(u8, &str)] = &[
    (5, "今天貓咪站在你這邊，想做的事儘管去做！"),
    (5, "好運像貓咪的呼嚕聲一樣，整天陪著你。"),
    (5, "貴人就在身邊，說不定正蹲在窗台上看著你。"),
    (4, "努力會被看見，就像貓咪總會發現你打開罐頭。"),
    (4, "適合嘗試新事物，像貓咪探索新紙箱一樣勇敢。"),
    (4, "人緣大好，今天的你比貓薄荷還受歡迎。"),
    (4, "財運小旺，記得犒賞自己一點小點心。"),
    (3, "平穩的一天，像午後曬太陽的貓一樣自在就好。"),
    (3, "事情不急，伸個懶腰再出發也不遲。"),
    (3, "保持好奇心，轉角可能藏著小驚喜。"),
    (3, "今天適合整理房間，說不定會找到失蹤的逗貓棒。"),
    (2, "小心分心，別像追雷射筆的貓一樣團團轉。"),
    (2, "說話前先想三秒，避免不小心伸出爪子。"),
    (2, "計畫可能臨時變動，學貓咪隨遇而安吧。"),
    (1, "今天容易打翻東西，桌邊的杯子離遠一點。"),
    (1, "運氣打了個盹，早點休息，明天再戰。"),
    (0, "貓咪說今天什麼都別做，躺平就是最好的安排。"),
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fortune {
    pub stars: u8,
    pub message: String,
}

/// One record from the cat image API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatImage {
    pub id: String,
    pub url: String,
    pub width: u32,
    pub height: u32,
}

/// The daily artifact. Stored verbatim as JSON under the result key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FortuneResult {
    pub cat_image: CatImage,
    pub fortune: Fortune,
    pub date: String,
}

/// Fortune at `index` of the bundled list (wraps around).
pub fn fortune_at(index: usize) -> Fortune {
    let (stars, message) = FORTUNES[index % FORTUNES.len()];
    Fortune { stars: stars.min(MAX_STARS), message: message.to_string() }
}

/// Uniform index in `0..len` from the platform entropy source.
pub fn random_index(len: usize) -> Result<usize, FortuneError> {
    let len = u32::try_from(len).map_err(|_| FortuneError::Random("range too large".into()))?;
    if len == 0 {
        return Err(FortuneError::Random("empty range".into()));
    }
    // Reject the tail of the u32 range so every index is equally likely.
    let zone = u32::MAX - (u32::MAX % len);
    loop {
        let mut buf = [0u8; 4];
        getrandom::getrandom(&mut buf).map_err(|e| FortuneError::Random(e.to_string()))?;
        let v = u32::from_le_bytes(buf);
        if v < zone {
            return Ok((v % len) as usize);
        }
    }
}

pub fn pick_fortune() -> Result<Fortune, FortuneError> {
    Ok(fortune_at(random_index(FORTUNES.len())?))
}

/// `stars` filled glyphs followed by empty ones, `max` in total.
pub fn star_rating(stars: u8, max: u8) -> String {
    let filled = stars.min(max) as usize;
    let mut out = String::with_capacity(max as usize * 3);
    out.extend(std::iter::repeat_n('★', filled));
    out.extend(std::iter::repeat_n('☆', max as usize - filled));
    out
}

/// Fetch, pick, stamp and persist one fortune.
pub async fn draw_fortune<I, S, C>(
    source: &I,
    store: &FortuneStore<S, C>,
) -> Result<FortuneResult, FortuneError>
where
    I: ImageSource + ?Sized,
    S: KeyValueStore,
    C: Calendar,
{
    let cat_image = source.fetch_image().await?;
    let fortune = pick_fortune()?;
    let result = FortuneResult {
        cat_image,
        fortune,
        date: store.today().to_string(),
    };
    store.save(&result)?;
    Ok(result)
}
