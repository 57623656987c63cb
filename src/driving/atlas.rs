//! Road atlas: the road-network service the session consumes
//!
//! A petgraph-backed directed graph of junctions and road segments that
//! answers waypoint projections, traces drivable routes at a fixed
//! resolution, and classifies off-road/sidewalk positions.

use anyhow::{Context, Result};
use ordered_float::OrderedFloat;
use petgraph::algo::astar;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

use super::geometry::signed_yaw_delta;
use super::types::{
    LaneId, Position, RoadId, RoadOption, RoutePoint, Transform, Waypoint, LANE_HALF_WIDTH,
    ROUTE_RESOLUTION, SIDEWALK_WIDTH,
};

/// A wrapper type for junction IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JunctionId(pub usize);

/// Yaw change below which a junction transition still counts as straight
const STRAIGHT_TURN_THRESHOLD: f32 = 30.0;

/// A directed road segment connecting two junctions
#[derive(Debug, Clone)]
pub struct Road {
    pub id: RoadId,
    pub start: JunctionId,
    pub end: JunctionId,
    pub length: f32,
    pub yaw: f32,
    pub lane_id: LaneId,
}

/// Edge data for the road graph
#[derive(Debug, Clone, Copy)]
struct RoadEdge {
    road_id: RoadId,
    /// Road length scaled by 100 for integer weights
    weight: u32,
}

impl RoadEdge {
    fn from_road(road: &Road) -> Self {
        let weight = (road.length * 100.0) as u32;
        Self {
            road_id: road.id,
            weight: weight.max(1),
        }
    }
}

/// Projection of a free position onto the road network
#[derive(Debug, Clone, Copy)]
struct RoadProjection {
    road_id: RoadId,
    /// Distance along the road centerline
    along: f32,
    /// Perpendicular distance from the centerline
    offset: f32,
}

/// Directed road graph with waypoint and route queries
#[derive(Default)]
pub struct RoadAtlas {
    graph: DiGraph<JunctionId, RoadEdge>,
    junction_to_node: HashMap<JunctionId, NodeIndex>,
    node_to_junction: HashMap<NodeIndex, JunctionId>,
    junction_positions: HashMap<JunctionId, Position>,
    roads: HashMap<RoadId, Road>,
    next_id: usize,
}

impl RoadAtlas {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_raw_id(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Add a junction to the atlas
    pub fn add_junction(&mut self, position: Position) -> JunctionId {
        let id = JunctionId(self.next_raw_id());
        let node_index = self.graph.add_node(id);
        self.junction_to_node.insert(id, node_index);
        self.node_to_junction.insert(node_index, id);
        self.junction_positions.insert(id, position);
        id
    }

    /// Add a one-way road between two junctions
    pub fn add_road(&mut self, start: JunctionId, end: JunctionId) -> Result<RoadId> {
        self.add_road_with_lane(start, end, LaneId(1))
    }

    fn add_road_with_lane(
        &mut self,
        start: JunctionId,
        end: JunctionId,
        lane_id: LaneId,
    ) -> Result<RoadId> {
        let start_pos = *self
            .junction_positions
            .get(&start)
            .context("Start junction not found")?;
        let end_pos = *self
            .junction_positions
            .get(&end)
            .context("End junction not found")?;

        let id = RoadId(self.next_raw_id());
        let road = Road {
            id,
            start,
            end,
            length: start_pos.distance_2d(&end_pos),
            yaw: start_pos.yaw_to(&end_pos),
            lane_id,
        };

        let start_node = self.junction_to_node[&start];
        let end_node = self.junction_to_node[&end];
        self.graph
            .add_edge(start_node, end_node, RoadEdge::from_road(&road));
        self.roads.insert(id, road);
        Ok(id)
    }

    /// Add a two-way road: two directed roads sharing one centerline,
    /// distinguished by the sign of their lane id
    pub fn add_two_way_road(
        &mut self,
        start: JunctionId,
        end: JunctionId,
    ) -> Result<(RoadId, RoadId)> {
        let forward = self.add_road_with_lane(start, end, LaneId(1))?;
        let backward = self.add_road_with_lane(end, start, LaneId(-1))?;
        Ok((forward, backward))
    }

    pub fn junction_position(&self, id: JunctionId) -> Option<&Position> {
        self.junction_positions.get(&id)
    }

    pub fn road(&self, id: RoadId) -> Option<&Road> {
        self.roads.get(&id)
    }

    pub fn road_count(&self) -> usize {
        self.roads.len()
    }

    pub fn junction_count(&self) -> usize {
        self.junction_to_node.len()
    }

    fn road_endpoints(&self, road: &Road) -> Option<(Position, Position)> {
        let start = *self.junction_positions.get(&road.start)?;
        let end = *self.junction_positions.get(&road.end)?;
        Some((start, end))
    }

    /// Point on a road centerline at `along` units from its start
    fn point_on_road(&self, road: &Road, along: f32) -> Option<Position> {
        let (start, end) = self.road_endpoints(road)?;
        if road.length < 1e-6 {
            return Some(start);
        }
        let t = (along / road.length).clamp(0.0, 1.0);
        Some(Position::new(
            start.x + (end.x - start.x) * t,
            start.y + (end.y - start.y) * t,
            start.z + (end.z - start.z) * t,
        ))
    }

    fn waypoint_on_road(&self, road: &Road, along: f32) -> Option<Waypoint> {
        let location = self.point_on_road(road, along)?;
        Some(Waypoint {
            transform: Transform::new(location, road.yaw),
            road_id: road.id,
            lane_id: road.lane_id,
        })
    }

    /// Project a position onto the nearest road centerline
    ///
    /// Ties between overlapping roads (two-way twins) break on road id so
    /// repeated queries stay deterministic.
    fn project(&self, position: Position) -> Option<RoadProjection> {
        self.roads
            .values()
            .filter_map(|road| {
                let (start, end) = self.road_endpoints(road)?;
                let seg_x = end.x - start.x;
                let seg_y = end.y - start.y;
                let len_sq = seg_x * seg_x + seg_y * seg_y;
                if len_sq < 1e-6 {
                    return None;
                }
                let t = (((position.x - start.x) * seg_x + (position.y - start.y) * seg_y)
                    / len_sq)
                    .clamp(0.0, 1.0);
                let closest =
                    Position::new(start.x + t * seg_x, start.y + t * seg_y, start.z);
                Some(RoadProjection {
                    road_id: road.id,
                    along: t * road.length,
                    offset: position.distance_2d(&closest),
                })
            })
            .min_by_key(|p| (OrderedFloat(p.offset), p.road_id.0))
    }

    /// Nearest drivable waypoint to a free position
    pub fn waypoint_at(&self, position: Position) -> Option<Waypoint> {
        let projection = self.project(position)?;
        let road = self.roads.get(&projection.road_id)?;
        self.waypoint_on_road(road, projection.along)
    }

    /// Waypoint `distance` units further along the lane the position maps to
    ///
    /// Clamps at the end of the current road rather than continuing across
    /// the junction.
    pub fn waypoint_ahead(&self, position: Position, distance: f32) -> Option<Waypoint> {
        let projection = self.project(position)?;
        let road = self.roads.get(&projection.road_id)?;
        self.waypoint_on_road(road, (projection.along + distance).min(road.length))
    }

    /// Whether the position sits on a drivable lane
    pub fn is_on_road(&self, position: Position) -> bool {
        self.project(position)
            .is_some_and(|p| p.offset <= LANE_HALF_WIDTH)
    }

    /// Whether the position sits in the sidewalk band flanking a road
    pub fn is_sidewalk(&self, position: Position) -> bool {
        self.project(position)
            .is_some_and(|p| p.offset > LANE_HALF_WIDTH && p.offset <= LANE_HALF_WIDTH + SIDEWALK_WIDTH)
    }

    /// Perpendicular distance from a position to a specific road centerline
    pub fn distance_to_road(&self, road_id: RoadId, position: Position) -> Option<f32> {
        let road = self.roads.get(&road_id)?;
        let (start, end) = self.road_endpoints(road)?;
        Some(super::geometry::point_to_segment_distance(
            position, start, end,
        ))
    }

    /// Midpoint poses usable as random-target candidates
    ///
    /// One pose per street: backward twins of two-way roads share the
    /// forward centerline and would only produce zero-length traces.
    pub fn spawn_transforms(&self) -> Vec<(RoadId, Transform)> {
        let mut spawns: Vec<(RoadId, Transform)> = self
            .roads
            .values()
            .filter(|road| road.lane_id.0 > 0)
            .filter_map(|road| {
                let wp = self.waypoint_on_road(road, road.length / 2.0)?;
                Some((road.id, wp.transform))
            })
            .collect();
        spawns.sort_by_key(|(id, _)| id.0);
        spawns
    }

    /// Shortest junction path using A* (Dijkstra with null heuristic),
    /// returned including the start junction
    fn find_junction_path(&self, start: JunctionId, end: JunctionId) -> Option<Vec<JunctionId>> {
        let start_node = self.junction_to_node.get(&start)?;
        let end_node = self.junction_to_node.get(&end)?;

        let (_, node_path) = astar(
            &self.graph,
            *start_node,
            |node| node == *end_node,
            |edge| edge.weight().weight,
            |_| 0,
        )?;

        Some(
            node_path
                .iter()
                .filter_map(|node| self.node_to_junction.get(node).copied())
                .collect(),
        )
    }

    fn road_between(&self, from: JunctionId, to: JunctionId) -> Result<&Road> {
        let from_node = self
            .junction_to_node
            .get(&from)
            .with_context(|| format!("Junction {:?} not found", from))?;
        let to_node = self
            .junction_to_node
            .get(&to)
            .with_context(|| format!("Junction {:?} not found", to))?;

        self.graph
            .edges(*from_node)
            .find(|edge| edge.target() == *to_node)
            .and_then(|edge| self.roads.get(&edge.weight().road_id))
            .with_context(|| format!("No road connecting {:?} to {:?}", from, to))
    }

    fn junction_out_degree(&self, junction: JunctionId) -> usize {
        self.junction_to_node
            .get(&junction)
            .map(|node| self.graph.edges(*node).count())
            .unwrap_or(0)
    }

    /// Maneuver option for entering `next` from `prev` at a junction
    fn transition_option(&self, prev: &Road, next: &Road) -> RoadOption {
        if self.junction_out_degree(next.start) <= 1 {
            return RoadOption::LaneFollow;
        }
        let delta = signed_yaw_delta(next.yaw, prev.yaw);
        if delta.abs() < STRAIGHT_TURN_THRESHOLD {
            RoadOption::Straight
        } else if delta > 0.0 {
            RoadOption::Left
        } else {
            RoadOption::Right
        }
    }

    /// Append waypoints sampled every route-resolution step along a road span
    ///
    /// `first_option` tags the first appended point; the rest are
    /// lane-follow. A leading point coinciding with the previously appended
    /// one is skipped so junction seams do not produce zero-length segments.
    fn sample_road_span(
        &self,
        road: &Road,
        from: f32,
        to: f32,
        first_option: RoadOption,
        out: &mut Vec<RoutePoint>,
    ) {
        let mut along = from;
        let mut option = first_option;
        loop {
            if let Some(waypoint) = self.waypoint_on_road(road, along) {
                let duplicate = out
                    .last()
                    .is_some_and(|prev| prev.location().distance_2d(&waypoint.transform.location) < 1e-3);
                if !duplicate {
                    out.push(RoutePoint { waypoint, option });
                    option = RoadOption::LaneFollow;
                }
            }
            if along >= to {
                break;
            }
            along = (along + ROUTE_RESOLUTION).min(to);
        }
    }

    /// Trace a drivable route between two free positions
    ///
    /// Both endpoints snap to their nearest road; the connecting roads come
    /// from the shortest junction path. Fails when either position cannot be
    /// projected or no path exists.
    pub fn trace_route(&self, start: Position, end: Position) -> Result<Vec<RoutePoint>> {
        let from = self
            .project(start)
            .context("Route start is not near any road")?;
        let to = self.project(end).context("Route end is not near any road")?;

        let start_road = self
            .roads
            .get(&from.road_id)
            .context("Projected start road missing")?;
        let end_road = self
            .roads
            .get(&to.road_id)
            .context("Projected end road missing")?;

        let mut route = Vec::new();

        if from.road_id == to.road_id && to.along >= from.along {
            self.sample_road_span(start_road, from.along, to.along, RoadOption::LaneFollow, &mut route);
            return Ok(route);
        }

        let junctions = self
            .find_junction_path(start_road.end, end_road.start)
            .with_context(|| {
                format!(
                    "No path from {:?} to {:?}",
                    start_road.end, end_road.start
                )
            })?;

        self.sample_road_span(
            start_road,
            from.along,
            start_road.length,
            RoadOption::LaneFollow,
            &mut route,
        );

        let mut prev_road = start_road;
        for pair in junctions.windows(2) {
            let road = self.road_between(pair[0], pair[1])?;
            let option = self.transition_option(prev_road, road);
            self.sample_road_span(road, 0.0, road.length, option, &mut route);
            prev_road = road;
        }

        let option = self.transition_option(prev_road, end_road);
        self.sample_road_span(end_road, 0.0, to.along, option, &mut route);

        Ok(route)
    }

    /// Small grid town used by the demo driver and tests
    ///
    /// A 3x3 junction grid with two-way roads, 20 units apart.
    pub fn demo_town() -> Self {
        let mut atlas = Self::new();
        let spacing = 20.0;
        let mut grid = [[JunctionId(0); 3]; 3];

        for (row, grid_row) in grid.iter_mut().enumerate() {
            for (col, cell) in grid_row.iter_mut().enumerate() {
                let x = (col as f32 - 1.0) * spacing;
                let y = (row as f32 - 1.0) * spacing;
                *cell = atlas.add_junction(Position::new(x, y, 0.0));
            }
        }

        for row in 0..3 {
            for col in 0..2 {
                let _ = atlas.add_two_way_road(grid[row][col], grid[row][col + 1]);
            }
        }
        for row in 0..2 {
            for col in 0..3 {
                let _ = atlas.add_two_way_road(grid[row][col], grid[row + 1][col]);
            }
        }

        atlas
    }
}
