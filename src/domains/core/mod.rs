pub mod asset_fetcher;

pub use asset_fetcher::{AssetFetcher, DownloadedAsset, FetchError, HttpAssetFetcher};
