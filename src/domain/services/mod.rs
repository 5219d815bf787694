//! # Domain Services
//!
//! 複数のエンティティにまたがるビジネスルール
//!
//! - **VersionSelectionService**: 要求を満たすバージョンの選択
//! - **DescriptorRenderer**: ビルド記述子の生成

pub mod descriptor_renderer;
pub mod version_selection;
