macro_rules! common_derives {
    ($($item:tt)*) => {
        #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
        #[cfg_attr(feature = "specta", derive(specta::Type))]
        $($item)*
    };
}

pub(crate) use common_derives;

pub mod batch;
pub mod stream;
