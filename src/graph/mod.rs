/*!
# Graph module
Contains the positional de Bruijn path graph: the arena that owns every node, the
structural edit operations (append, prepend, coalesce, merge, splitting, weight removal),
and the derived position-sliced subnode views consumed by traversal.
*/
/// Initial graph construction and the simplification passes
pub mod builder;
/// The arena graph and every structural operation on it
pub mod path_graph;
/// The compressed interval-annotated k-mer run, the core node type
pub mod path_node;
/// On-demand position-sliced views with constant neighbor sets
pub mod subnode;
