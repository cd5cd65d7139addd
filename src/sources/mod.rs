pub mod bilibili;
pub mod douban;
pub mod douban_rss;
pub mod jianshu;
pub mod youtube;

pub use bilibili::BilibiliSource;
pub use douban::DoubanSource;
pub use douban_rss::DoubanRssSource;
pub use jianshu::JianshuSource;
pub use youtube::YoutubeSource;
