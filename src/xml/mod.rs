/*!
 * XML tree walking.
 *
 * - `walker`: turns raw bytes into an element arena in document order
 * - `node`: the arena types and structural queries
 */

pub mod node;
pub mod walker;

pub use node::{Attribute, ElementNode, NodeId, XmlDocument};
pub use walker::walk;
